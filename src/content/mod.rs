//! Interface boundary of the portfolio content service.
//!
//! The hosted database and auth provider stay outside this crate. What lives
//! here is the contract the site relies on: the record shapes, the read
//! queries, payload normalization and the admin gate. [`InMemoryContent`]
//! backs the playground and the tests.

pub mod admin;
pub mod error;
pub mod validate;

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use admin::{AdminGate, Session};
pub use error::{ContentError, ServiceError};

use validate::{flag, object, optional_text, required_text, slug, url_list};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectType {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: Option<String>,
    /// Slug of the owning [`ProjectType`].
    pub project_type: Option<String>,
    pub image_urls: Vec<String>,
    pub link_urls: Vec<String>,
    pub draft: bool,
    pub archived: bool,
    /// ISO-8601 date; sorts lexicographically.
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub cover_url: Option<String>,
    pub draft: bool,
    pub archived: bool,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroContent {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub image_url: Option<String>,
}

/// Footer folder icon linking somewhere on or off the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderLink {
    pub label: String,
    pub href: String,
}

impl ProjectType {
    pub fn from_payload(value: &Value) -> Result<Self, ContentError> {
        let p = object(value)?;
        Ok(Self {
            slug: slug(p)?,
            name: required_text(p, "name")?,
            description: optional_text(p, "description")?,
        })
    }
}

impl Project {
    pub fn from_payload(value: &Value) -> Result<Self, ContentError> {
        let p = object(value)?;
        Ok(Self {
            slug: slug(p)?,
            title: required_text(p, "title")?,
            summary: optional_text(p, "summary")?,
            body: optional_text(p, "body")?,
            project_type: optional_text(p, "project_type")?,
            image_urls: url_list(p, "image_urls")?,
            link_urls: url_list(p, "link_urls")?,
            draft: flag(p, "draft")?,
            archived: flag(p, "archived")?,
            published_at: optional_text(p, "published_at")?,
        })
    }

    pub fn is_published(&self) -> bool {
        !self.draft && !self.archived
    }
}

impl Article {
    pub fn from_payload(value: &Value) -> Result<Self, ContentError> {
        let p = object(value)?;
        Ok(Self {
            slug: slug(p)?,
            title: required_text(p, "title")?,
            excerpt: optional_text(p, "excerpt")?,
            body: optional_text(p, "body")?,
            cover_url: optional_text(p, "cover_url")?,
            draft: flag(p, "draft")?,
            archived: flag(p, "archived")?,
            published_at: optional_text(p, "published_at")?,
        })
    }

    pub fn is_published(&self) -> bool {
        !self.draft && !self.archived
    }
}

impl HeroContent {
    pub fn from_payload(value: &Value) -> Result<Self, ContentError> {
        let p = object(value)?;
        Ok(Self {
            headline: optional_text(p, "headline")?,
            subheadline: optional_text(p, "subheadline")?,
            image_url: optional_text(p, "image_url")?,
        })
    }
}

impl FolderLink {
    /// Parse a list of `{label, href}` objects; blank entries are dropped.
    pub fn list_from_payload(value: &Value) -> Result<Vec<Self>, ContentError> {
        let items = value
            .as_array()
            .ok_or(ContentError::InvalidList { field: "links" })?;
        let mut links = Vec::with_capacity(items.len());
        for item in items {
            let p = object(item)?;
            let (Some(label), Some(href)) = (optional_text(p, "label")?, optional_text(p, "href")?)
            else {
                continue;
            };
            links.push(Self { label, href });
        }
        Ok(links)
    }
}

/// Public read side of the content service.
pub trait ContentSource {
    /// Neither draft nor archived, newest first.
    fn published_projects(&self) -> Result<Vec<Project>, ContentError>;
    /// Ordered by name.
    fn project_types(&self) -> Result<Vec<ProjectType>, ContentError>;
    /// Neither draft nor archived, newest first.
    fn published_articles(&self) -> Result<Vec<Article>, ContentError>;
    fn hero(&self) -> Result<HeroContent, ContentError>;
    fn folder_links(&self) -> Result<Vec<FolderLink>, ContentError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryContent {
    projects: BTreeMap<String, Project>,
    project_types: BTreeMap<String, ProjectType>,
    articles: BTreeMap<String, Article>,
    hero: HeroContent,
    folder_links: Vec<FolderLink>,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an admin session on the store; fails with 401/403 per the gate.
    pub fn admin<'a>(
        &'a mut self,
        gate: &AdminGate,
        session: Option<&Session>,
    ) -> Result<ContentAdmin<'a>, ContentError> {
        let session = gate.authorize(session)?;
        Ok(ContentAdmin {
            store: self,
            email: session.email.clone(),
        })
    }

    pub fn project(&self, slug: &str) -> Option<&Project> {
        self.projects.get(slug)
    }

    pub fn article(&self, slug: &str) -> Option<&Article> {
        self.articles.get(slug)
    }
}

fn newest_first<T>(items: impl Iterator<Item = T>, date: impl Fn(&T) -> Option<String>) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    // Undated records sort last; the map order keeps ties stable by slug.
    out.sort_by_key(|item| Reverse(date(item)));
    out
}

impl ContentSource for InMemoryContent {
    fn published_projects(&self) -> Result<Vec<Project>, ContentError> {
        Ok(newest_first(
            self.projects.values().filter(|p| p.is_published()).cloned(),
            |p: &Project| p.published_at.clone(),
        ))
    }

    fn project_types(&self) -> Result<Vec<ProjectType>, ContentError> {
        let mut types: Vec<ProjectType> = self.project_types.values().cloned().collect();
        types.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(types)
    }

    fn published_articles(&self) -> Result<Vec<Article>, ContentError> {
        Ok(newest_first(
            self.articles.values().filter(|a| a.is_published()).cloned(),
            |a: &Article| a.published_at.clone(),
        ))
    }

    fn hero(&self) -> Result<HeroContent, ContentError> {
        Ok(self.hero.clone())
    }

    fn folder_links(&self) -> Result<Vec<FolderLink>, ContentError> {
        Ok(self.folder_links.clone())
    }
}

/// Write access granted by [`InMemoryContent::admin`].
#[derive(Debug)]
pub struct ContentAdmin<'a> {
    store: &'a mut InMemoryContent,
    email: String,
}

impl ContentAdmin<'_> {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn upsert_project(&mut self, payload: &Value) -> Result<Project, ContentError> {
        let project = Project::from_payload(payload)?;
        tracing::debug!(slug = %project.slug, by = %self.email, "project saved");
        self.store
            .projects
            .insert(project.slug.clone(), project.clone());
        Ok(project)
    }

    pub fn delete_project(&mut self, slug: &str) -> Result<Project, ContentError> {
        self.store
            .projects
            .remove(slug)
            .ok_or_else(|| not_found("project", slug))
    }

    pub fn upsert_project_type(&mut self, payload: &Value) -> Result<ProjectType, ContentError> {
        let kind = ProjectType::from_payload(payload)?;
        self.store
            .project_types
            .insert(kind.slug.clone(), kind.clone());
        Ok(kind)
    }

    pub fn delete_project_type(&mut self, slug: &str) -> Result<ProjectType, ContentError> {
        let removed = self
            .store
            .project_types
            .remove(slug)
            .ok_or_else(|| not_found("project type", slug))?;
        // Projects keep existing, just without a type.
        for project in self.store.projects.values_mut() {
            if project.project_type.as_deref() == Some(slug) {
                project.project_type = None;
            }
        }
        Ok(removed)
    }

    pub fn upsert_article(&mut self, payload: &Value) -> Result<Article, ContentError> {
        let article = Article::from_payload(payload)?;
        tracing::debug!(slug = %article.slug, by = %self.email, "article saved");
        self.store
            .articles
            .insert(article.slug.clone(), article.clone());
        Ok(article)
    }

    pub fn delete_article(&mut self, slug: &str) -> Result<Article, ContentError> {
        self.store
            .articles
            .remove(slug)
            .ok_or_else(|| not_found("article", slug))
    }

    pub fn update_hero(&mut self, payload: &Value) -> Result<HeroContent, ContentError> {
        let hero = HeroContent::from_payload(payload)?;
        self.store.hero = hero.clone();
        Ok(hero)
    }

    pub fn set_folder_links(&mut self, payload: &Value) -> Result<Vec<FolderLink>, ContentError> {
        let links = FolderLink::list_from_payload(payload)?;
        self.store.folder_links = links.clone();
        Ok(links)
    }

    /// Every project, drafts and archived included.
    pub fn all_projects(&self) -> Vec<Project> {
        self.store.projects.values().cloned().collect()
    }

    pub fn all_articles(&self) -> Vec<Article> {
        self.store.articles.values().cloned().collect()
    }
}

fn not_found(kind: &'static str, slug: &str) -> ContentError {
    ContentError::NotFound {
        kind,
        slug: slug.to_string(),
    }
}
