//! Terminal playground: a two-route portfolio site rendered into a
//! [`Document`], driven by a [`Desk`] and drawn with ratatui.

use std::collections::BTreeMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde_json::json;

use crate::cli::PlaygroundCli;
use crate::config::DeskConfig;
use crate::constants::{
    DESKTOP_SELECTOR, FLOAT_LAYER_ID, FOLDER_SELECTOR, HREF_ATTR, IMAGE_SELECTOR, NEW_WINDOW_ATTR,
    NO_SCATTER_ATTR, TITLE_ATTR, WINDOW_CLASS,
};
use crate::content::{
    AdminGate, ContentError, ContentSource, InMemoryContent, Project, ServiceError, Session,
};
use crate::debug_log::{DebugLogHandle, set_global_debug_log};
use crate::desk::{ClickDisposition, Desk};
use crate::dom::{Document, NodeId};
use crate::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use crate::drivers::mouse::{PointerKind, page_size, pointer_event};
use crate::effects::Bitmap;
use crate::event_loop::{ControlFlow, EventLoop, LoopEvent};
use crate::geometry::{Geometry, Point};
use crate::render::{RenderContext, TEXT_ATTR, render_desk};
use crate::window::PointerOutcome;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Simulated network latency between an image appearing and its data.
const IMAGE_LATENCY: Duration = Duration::from_millis(180);
const WINDOW_SIZE: (u32, u32) = (240, 160);
/// Images whose source contains this marker fail to load.
const BROKEN_IMAGE_MARKER: &str = "broken";

const DEMO_TITLES: &[&str] = &[
    "Paint",
    "Notepad",
    "Minesweeper",
    "Sound Recorder",
    "Cardfile",
    "Calculator",
    "Clock",
    "Terminal",
    "Write",
    "Reversi",
    "Calendar",
    "Character Map",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Desktop,
    Project(String),
}

impl Route {
    /// Site-internal routes only; anything else is an external link.
    pub fn parse(href: &str) -> Option<Self> {
        match href.trim_end_matches('/') {
            "" => Some(Self::Desktop),
            path => path
                .strip_prefix("/projects/")
                .filter(|slug| !slug.is_empty() && !slug.contains('/'))
                .map(|slug| Self::Project(slug.to_string())),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Desktop => "/".to_string(),
            Self::Project(slug) => format!("/projects/{slug}"),
        }
    }
}

/// Seed a store the way an admin would: through validated payloads.
pub fn demo_content(windows: usize) -> Result<InMemoryContent, ContentError> {
    let mut content = InMemoryContent::new();
    let session = Session::new("playground@localhost");
    let mut admin = content.admin(&AdminGate::default(), Some(&session))?;
    admin.upsert_project_type(&json!({ "slug": "apps", "name": "Accessories" }))?;
    for (i, title) in DEMO_TITLES.iter().cycle().take(windows).enumerate() {
        let slug = format!("{}-{i}", title.to_ascii_lowercase().replace(' ', "-"));
        admin.upsert_project(&json!({
            "slug": slug,
            "title": title,
            "summary": format!("{title}, a desktop accessory."),
            "body": format!(
                "{title} was one of the original accessories.\nDrag me by the title bar."
            ),
            "project_type": "apps",
            "image_urls": format!("/img/{slug}.svg\n/img/{slug}.svg"),
            "published_at": format!("1992-04-{:02}", (i % 28) + 1),
        }))?;
    }
    admin.upsert_project(&json!({
        "slug": "unreleased",
        "title": "Unreleased",
        "draft": "true",
    }))?;
    admin.update_hero(&json!({
        "headline": "  Welcome to the desktop  ",
        "subheadline": "Press n for a new window, r to go home, q to quit.",
    }))?;
    admin.set_folder_links(&json!([
        { "label": "Home", "href": "/" },
        { "label": "Missing", "href": "/projects/nowhere" },
        { "label": "", "href": "/ignored" },
    ]))?;
    Ok(content)
}

pub struct Playground {
    desk: Desk,
    content: InMemoryContent,
    route: Route,
    scatter: bool,
    picture: Option<Bitmap>,
    images: BTreeMap<NodeId, Bitmap>,
    pending_loads: BTreeMap<NodeId, Instant>,
    page: Geometry,
    new_windows: usize,
    started: Instant,
    log: Option<DebugLogHandle>,
}

impl Playground {
    pub fn new(
        config: DeskConfig,
        content: InMemoryContent,
        picture: Option<Bitmap>,
        scatter: bool,
        page: (u32, u32),
        now: Instant,
    ) -> Self {
        let mut playground = Self {
            desk: Desk::new(config),
            content,
            route: Route::Desktop,
            scatter,
            picture,
            images: BTreeMap::new(),
            pending_loads: BTreeMap::new(),
            page: Geometry::new(0, 0, page.0, page.1),
            new_windows: 0,
            started: now,
            log: None,
        };
        playground.set_page_layout();
        playground.render_route();
        playground.desk.page_ready(now);
        playground.desk.window_loaded(now);
        playground.schedule_image_loads(now);
        playground
    }

    pub fn with_log(mut self, log: DebugLogHandle) -> Self {
        self.log = Some(log);
        self
    }

    pub fn desk(&self) -> &Desk {
        &self.desk
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn images(&self) -> &BTreeMap<NodeId, Bitmap> {
        &self.images
    }

    pub fn navigate(&mut self, route: Route, now: Instant) {
        tracing::debug!(from = %self.route.path(), to = %route.path(), "navigate");
        self.route = route;
        self.render_route();
        self.desk.route_changed(now);
        self.images.retain(|&img, _| self.desk.document().contains(img));
        self.pending_loads
            .retain(|&img, _| self.desk.document().contains(img));
        self.schedule_image_loads(now);
    }

    /// Frame boundary: deliver due image loads, then tick the engine.
    pub fn frame(&mut self, now: Instant) {
        self.schedule_image_loads(now);
        let due: Vec<NodeId> = self
            .pending_loads
            .iter()
            .filter(|&(_, &at)| at <= now)
            .map(|(&img, _)| img)
            .collect();
        for image in due {
            self.pending_loads.remove(&image);
            self.deliver_image(image, now);
        }
        self.desk.tick(now);
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) -> ControlFlow {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key, now),
            Event::Mouse(mouse) => {
                if let Some(pointer) = pointer_event(&mouse) {
                    self.handle_pointer(pointer.kind, pointer.point, now);
                }
                ControlFlow::Continue
            }
            Event::Resize(columns, rows) => {
                let (width, height) = page_size(columns, rows.saturating_sub(1));
                self.page = Geometry::new(0, 0, width, height);
                self.set_page_layout();
                self.desk.window_loaded(now);
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        }
    }

    pub fn status_line(&self) -> String {
        let top = self
            .desk
            .topmost()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let gesture = self
            .desk
            .active_gesture()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let last = self
            .log
            .as_ref()
            .and_then(DebugLogHandle::last)
            .unwrap_or_default();
        format!(
            " {} | windows {} | top {top} | gesture {gesture} | reveals {} | {last}",
            self.route.path(),
            self.desk.registry().len(),
            self.desk.reveals().active_count(),
        )
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> ControlFlow {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return ControlFlow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ControlFlow::Quit;
            }
            KeyCode::Char('r') => self.navigate(Route::Desktop, now),
            KeyCode::Char('n') => self.add_window(now),
            KeyCode::Char('s') => {
                let placed = self.desk.reapply_scatter_effect();
                tracing::debug!(placed, "scatter reapplied");
            }
            KeyCode::Char('p') => {
                let attached = self.desk.reinitialize_pixel_effect();
                tracing::debug!(attached, "pixel effect reinitialized");
            }
            KeyCode::Char('b') => {
                self.desk.refresh_breathing_shadow();
            }
            _ => {}
        }
        ControlFlow::Continue
    }

    fn handle_pointer(&mut self, kind: PointerKind, point: Point, now: Instant) {
        match kind {
            PointerKind::Down => {
                self.desk.pointer_down(point, now);
            }
            PointerKind::Move => {
                self.desk.pointer_move(point, now);
            }
            PointerKind::Up => {
                let outcome = self.desk.pointer_up(point, now);
                if matches!(outcome, PointerOutcome::Ended { click: false, .. }) {
                    // Browsers still fire the click after a drag; the desk
                    // swallows it.
                    self.desk.click(point);
                    return;
                }
                self.follow_click(point, now);
            }
        }
    }

    fn follow_click(&mut self, point: Point, now: Instant) {
        let href = match self.desk.click(point) {
            ClickDisposition::Suppressed => return,
            ClickDisposition::Allowed { target: Some(id) } => self
                .desk
                .registry()
                .get(id)
                .and_then(|h| self.desk.document().attribute(h.node, HREF_ATTR))
                .map(str::to_string),
            ClickDisposition::Allowed { target: None } => self.folder_href_at(point),
        };
        let Some(href) = href else {
            return;
        };
        match Route::parse(&href) {
            Some(route) => self.navigate(route, now),
            None => tracing::debug!(href = %href, "external link not followed"),
        }
    }

    fn folder_href_at(&self, point: Point) -> Option<String> {
        let doc = self.desk.document();
        doc.query_all(FOLDER_SELECTOR)
            .into_iter()
            .find(|&folder| doc.layout(folder).contains(point))
            .and_then(|folder| doc.attribute(folder, HREF_ATTR))
            .map(str::to_string)
    }

    fn set_page_layout(&mut self) {
        let page = self.page;
        let doc = self.desk.document_mut();
        doc.set_layout(doc.root(), page);
        doc.set_layout(doc.body(), page);
        for container in doc.query_all(DESKTOP_SELECTOR) {
            doc.set_layout(container, page);
        }
    }

    /// Replace the page content for the current route. The float layer
    /// belongs to the engine and is left alone.
    fn render_route(&mut self) {
        let doc = self.desk.document_mut();
        let body = doc.body();
        for child in doc.children(body).to_vec() {
            if doc.attribute(child, "id") == Some(FLOAT_LAYER_ID) {
                continue;
            }
            if let Err(err) = doc.remove(child) {
                tracing::warn!(error = %err, "could not clear page");
            }
        }
        let result = match self.route.clone() {
            Route::Desktop => self.render_desktop(),
            Route::Project(slug) => self.render_project(&slug),
        };
        if let Err(err) = result {
            let err = ServiceError::from(err);
            tracing::warn!(status = err.status, message = %err.message, "content unavailable");
            self.render_fallback(&err);
        }
    }

    fn render_desktop(&mut self) -> Result<(), ContentError> {
        let projects = self.content.published_projects()?;
        let links = self.content.folder_links()?;
        let hero = self.content.hero()?;
        let page = self.page;
        let scatter = self.scatter;
        let doc = self.desk.document_mut();

        let desktop = doc.create_with_classes("div", &["retro-desktop"]);
        let body = doc.body();
        append_logged(doc, body, desktop);
        doc.set_layout(desktop, page);
        if !scatter {
            doc.set_attribute(desktop, NO_SCATTER_ATTR, "");
        }

        let hero_title = hero.headline.as_deref().unwrap_or("Desktop");
        let hero_text = hero.subheadline.as_deref().unwrap_or_default();
        let hero_window = append_window(doc, desktop, hero_title, hero_text, None);
        doc.set_layout(hero_window, cascade(page, 0));

        for (i, project) in projects.iter().enumerate() {
            let window = append_project_window(doc, desktop, project);
            doc.set_layout(window, cascade(page, i + 1));
            if let Some(img) = doc.select(window, IMAGE_SELECTOR).first().copied() {
                doc.set_layout(img, image_box(doc.layout(window)));
            }
        }
        for (i, link) in links.iter().enumerate() {
            let folder = doc.create_with_classes("div", &["retro-folder"]);
            doc.set_attribute(folder, TITLE_ATTR, link.label.clone());
            doc.set_attribute(folder, HREF_ATTR, link.href.clone());
            append_logged(doc, desktop, folder);
            let x = page.right() - 96;
            doc.set_layout(folder, Geometry::new(x, 16 + i as i32 * 64, 80, 48));
        }
        Ok(())
    }

    fn render_project(&mut self, slug: &str) -> Result<(), ContentError> {
        let project = self
            .content
            .project(slug)
            .filter(|p| p.is_published())
            .cloned()
            .ok_or_else(|| ContentError::NotFound {
                kind: "project",
                slug: slug.to_string(),
            })?;
        let page = self.page;
        let doc = self.desk.document_mut();
        let body = doc.body();
        let window = append_window(
            doc,
            body,
            &project.title,
            project.body.as_deref().unwrap_or_default(),
            Some("/"),
        );
        let width = (page.width * 3 / 4).max(WINDOW_SIZE.0);
        let height = (page.height * 3 / 4).max(WINDOW_SIZE.1);
        let rect = Geometry::new(
            (page.width.saturating_sub(width) / 2) as i32,
            (page.height.saturating_sub(height) / 2) as i32,
            width,
            height,
        );
        doc.set_layout(window, rect);
        for url in project.image_urls.iter().take(1) {
            let img = doc.create_element("img");
            doc.set_attribute(img, "src", url.clone());
            append_logged(doc, window, img);
            doc.set_layout(img, image_box(rect));
        }
        Ok(())
    }

    fn render_fallback(&mut self, err: &ServiceError) {
        let page = self.page;
        let text = serde_json::to_string(err).unwrap_or_else(|_| err.message.clone());
        let doc = self.desk.document_mut();
        let body = doc.body();
        let window = append_window(doc, body, "Error", &text, Some("/"));
        doc.set_layout(window, cascade(page, 1));
    }

    fn add_window(&mut self, now: Instant) {
        let page = self.page;
        let doc = self.desk.document_mut();
        let parent = doc
            .query_all(DESKTOP_SELECTOR)
            .first()
            .copied()
            .unwrap_or_else(|| doc.body());
        self.new_windows += 1;
        let title = format!("Untitled {}", self.new_windows);
        let window = append_window(doc, parent, &title, "Opened just now.", None);
        doc.set_attribute(window, NEW_WINDOW_ATTR, "");
        let offset = (self.new_windows % 8) as i32 * 24;
        doc.set_layout(
            window,
            Geometry::new(
                page.width as i32 / 3 + offset,
                page.height as i32 / 4 + offset,
                WINDOW_SIZE.0,
                WINDOW_SIZE.1,
            ),
        );
        let img = doc.create_element("img");
        doc.set_attribute(img, "src", format!("/img/new-{}.svg", self.new_windows));
        append_logged(doc, window, img);
        doc.set_layout(img, image_box(doc.layout(window)));
        tracing::debug!(title = %title, "window opened");
        // The mutation bridge picks the window up on the next tick.
        self.schedule_image_loads(now);
    }

    fn schedule_image_loads(&mut self, now: Instant) {
        let doc = self.desk.document();
        let mut delay = IMAGE_LATENCY;
        for img in doc.query_all(IMAGE_SELECTOR) {
            if self.images.contains_key(&img) || self.pending_loads.contains_key(&img) {
                continue;
            }
            self.pending_loads.insert(img, now + delay);
            delay += IMAGE_LATENCY / 2;
        }
    }

    fn deliver_image(&mut self, image: NodeId, now: Instant) {
        let src = self
            .desk
            .document()
            .attribute(image, "src")
            .unwrap_or_default()
            .to_string();
        if src.contains(BROKEN_IMAGE_MARKER) {
            self.desk.image_failed(image);
            return;
        }
        let bitmap = match &self.picture {
            Some(picture) => Ok(picture.clone()),
            None => gradient_for(&src),
        };
        match bitmap {
            Ok(bitmap) => {
                self.images.insert(image, bitmap.clone());
                self.desk.image_loaded(image, bitmap, now);
            }
            Err(err) => {
                tracing::warn!(image = %image, error = %err, "image decode failed");
                self.desk.image_failed(image);
            }
        }
    }
}

fn append_window(
    doc: &mut Document,
    parent: NodeId,
    title: &str,
    text: &str,
    href: Option<&str>,
) -> NodeId {
    let window = doc.create_with_classes("div", &[WINDOW_CLASS]);
    doc.set_attribute(window, TITLE_ATTR, title);
    if !text.is_empty() {
        doc.set_attribute(window, TEXT_ATTR, text);
    }
    if let Some(href) = href {
        doc.set_attribute(window, HREF_ATTR, href);
    }
    append_logged(doc, parent, window);
    window
}

fn append_logged(doc: &mut Document, parent: NodeId, child: NodeId) {
    if let Err(err) = doc.append_child(parent, child) {
        tracing::warn!(parent = %parent, child = %child, error = %err, "could not insert node");
    }
}

fn append_project_window(doc: &mut Document, parent: NodeId, project: &Project) -> NodeId {
    let href = format!("/projects/{}", project.slug);
    let window = append_window(
        doc,
        parent,
        &project.title,
        project.summary.as_deref().unwrap_or_default(),
        Some(&href),
    );
    if let Some(url) = project.image_urls.first() {
        let img = doc.create_element("img");
        doc.set_attribute(img, "src", url.clone());
        append_logged(doc, window, img);
    }
    window
}

/// Authored (unscattered) layout: a diagonal cascade.
fn cascade(page: Geometry, index: usize) -> Geometry {
    let step = 32 * (index % 10) as i32;
    Geometry::new(
        page.x + 24 + step + (index / 10) as i32 * 48,
        page.y + 24 + step,
        WINDOW_SIZE.0,
        WINDOW_SIZE.1,
    )
}

/// Lower part of a window, below the title bar and a line of text.
fn image_box(window: Geometry) -> Geometry {
    Geometry::new(
        window.x + 8,
        window.y + 48,
        window.width.saturating_sub(16),
        window.height.saturating_sub(56),
    )
}

/// Deterministic stand-in artwork, colored by a hash of the source.
fn gradient_for(src: &str) -> crate::error::DeskResult<Bitmap> {
    let hash = src
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    let [a, b, c, d] = hash.to_le_bytes();
    Bitmap::gradient(64, 32, [a, b, c], [d, a ^ 0xff, b ^ 0xff])
}

/// Entry point of the binary.
pub fn run(cli: &PlaygroundCli) -> io::Result<()> {
    let config = DeskConfig::try_from(cli)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
    let picture = cli
        .image
        .as_ref()
        .map(Bitmap::from_svg_path)
        .transpose()
        .map_err(io::Error::other)?;
    let content = demo_content(cli.windows).map_err(io::Error::other)?;

    let log = DebugLogHandle::default();
    set_global_debug_log(log.clone());
    crate::tracing_sub::init_default();

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let (columns, rows) = output.size()?;
    let now = Instant::now();
    let mut playground = Playground::new(
        config,
        content,
        picture,
        !cli.no_scatter,
        page_size(columns, rows.saturating_sub(1)),
        now,
    )
    .with_log(log);

    let mut event_loop = EventLoop::new(ConsoleInputDriver::new(), FRAME_INTERVAL);
    let result = event_loop.run(|event| match event {
        LoopEvent::Frame(now) => {
            playground.frame(now);
            let ctx = RenderContext {
                images: playground.images(),
                elapsed: playground.elapsed(now),
                status: playground.status_line(),
            };
            output.draw(|frame| render_desk(frame, playground.desk(), &ctx))?;
            Ok(ControlFlow::Continue)
        }
        LoopEvent::Input(event) => Ok(playground.handle_event(event, Instant::now())),
    });
    output.exit()?;
    result
}
