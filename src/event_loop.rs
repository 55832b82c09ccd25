use std::io;
use std::time::{Duration, Instant};

use crossterm::event::Event;

use crate::drivers::InputDriver;

pub enum ControlFlow {
    Continue,
    Quit,
}

/// What the loop hands to its handler.
#[derive(Debug)]
pub enum LoopEvent {
    Input(Event),
    /// Frame boundary; the handler ticks the desk and redraws.
    Frame(Instant),
}

/// Single-threaded pump driving the playground.
///
/// Each iteration emits one [`LoopEvent::Frame`] and then drains every input
/// event that is already queued, so pointer bursts during a drag never lag
/// behind rendering. `frame_interval` bounds how long the loop waits for
/// input before the next frame.
pub struct EventLoop<D> {
    driver: D,
    frame_interval: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, frame_interval: Duration) -> Self {
        Self {
            driver,
            frame_interval,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(LoopEvent) -> io::Result<ControlFlow>,
    {
        loop {
            if let ControlFlow::Quit = handler(LoopEvent::Frame(Instant::now()))? {
                return Ok(());
            }
            if !self.driver.poll(self.frame_interval)? {
                continue;
            }
            loop {
                let event = self.driver.read()?;
                if let ControlFlow::Quit = handler(LoopEvent::Input(event))? {
                    return Ok(());
                }
                if !self.driver.poll(Duration::ZERO)? {
                    break;
                }
            }
        }
    }
}
