//! Keeps the location fragment and the viewer in step.
//!
//! Fragment changes open, switch or close the viewer with
//! `NavigationOrigin::FragmentChange`, so the controller does not write the
//! fragment back. Navigation started here (gestures, `open`) queues fragment
//! updates that `sync_location` writes out. Fragments written are queued
//! until the host echoes them back, so those notifications are ignored even
//! when they arrive after later writes.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::fragment::{format_fragment, parse_fragment, FragmentTarget, CLOSED_FRAGMENT};
use super::gestures::Gesture;
use crate::models::ItemHandle;
use crate::presentation::Location;
use crate::session::{FragmentUpdate, NavigationOrigin, SessionController};

pub struct NavigationBridge {
    controller: SessionController,
    location: Box<dyn Location>,
    /// Fragments written whose change notification has not come back yet, oldest first.
    pending_echoes: VecDeque<String>,
}

impl NavigationBridge {
    pub fn new(controller: SessionController, location: Box<dyn Location>) -> Self {
        Self {
            controller,
            location,
            pending_echoes: VecDeque::new(),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SessionController {
        &mut self.controller
    }

    /// Open the viewer if the page was loaded with a viewer fragment.
    pub fn restore_from_location(&mut self) -> bool {
        let fragment = self.location.fragment();
        match parse_fragment(&fragment) {
            FragmentTarget::Item(_) => self.on_fragment_change(&fragment),
            FragmentTarget::Other => false,
        }
    }

    /// The host reports a location fragment change.
    ///
    /// Returns true if the viewer state changed.
    pub fn on_fragment_change(&mut self, fragment: &str) -> bool {
        let fragment = normalize(fragment);
        if self.take_echo(&fragment) {
            trace!(%fragment, "Ignoring echo of our own fragment");
            return false;
        }

        let changed = match parse_fragment(&fragment) {
            FragmentTarget::Item(handle) => self.show_from_fragment(&handle),
            FragmentTarget::Other => {
                if self.controller.state().is_open() {
                    debug!(%fragment, "Fragment left the viewer, closing");
                    self.controller.close(NavigationOrigin::FragmentChange);
                    true
                } else {
                    false
                }
            }
        };

        self.sync_location();
        changed
    }

    /// Consume `fragment` as an echo of a write. Notifications arrive in write
    /// order; earlier entries the host coalesced away are dropped with it.
    /// A change that matches no write is external and clears the queue.
    fn take_echo(&mut self, fragment: &str) -> bool {
        match self.pending_echoes.iter().position(|f| f == fragment) {
            Some(pos) => {
                self.pending_echoes.drain(..=pos);
                true
            }
            None => {
                self.pending_echoes.clear();
                false
            }
        }
    }

    fn show_from_fragment(&mut self, handle: &ItemHandle) -> bool {
        let state = self.controller.state();
        if state.is_open() && state.current.as_ref() == Some(handle) {
            return false;
        }
        if self.controller.index_of(handle).is_none() {
            debug!(item = %handle, "Fragment names an item not on this page");
            return false;
        }
        self.controller
            .open_or_switch_to(handle, NavigationOrigin::FragmentChange)
    }

    /// Open the viewer on `handle` on behalf of the user.
    pub fn open(&mut self, handle: &ItemHandle) -> bool {
        let opened = self
            .controller
            .open_or_switch_to(handle, NavigationOrigin::User);
        self.sync_location();
        opened
    }

    pub fn handle_gesture(&mut self, gesture: Gesture) -> bool {
        let changed = match gesture {
            Gesture::Next => self.controller.next(),
            Gesture::Prev => self.controller.prev(),
            Gesture::Close => {
                let open = self.controller.state().is_open();
                self.controller.close(NavigationOrigin::User);
                open
            }
            Gesture::ToggleFullscreen => {
                if !self.controller.state().is_open() {
                    return false;
                }
                self.controller.toggle_fullscreen();
                true
            }
        };
        self.sync_location();
        changed
    }

    /// Map a key press to a gesture and handle it. Unmapped keys are ignored.
    pub fn handle_key(&mut self, key: &str) -> bool {
        match Gesture::from_key(key) {
            Some(gesture) => self.handle_gesture(gesture),
            None => false,
        }
    }

    /// Write queued fragment updates to the location.
    pub fn sync_location(&mut self) {
        for update in self.controller.take_fragment_updates() {
            let fragment = match update {
                FragmentUpdate::Show(handle) => format_fragment(&handle),
                FragmentUpdate::Clear => CLOSED_FRAGMENT.to_string(),
            };
            if normalize(&self.location.fragment()) == fragment {
                continue;
            }
            trace!(%fragment, "Writing location fragment");
            self.location.set_fragment(&fragment);
            self.pending_echoes.push_back(fragment);
        }
    }

    /// Apply the next load event of the session.
    pub async fn process_next(&mut self) -> bool {
        self.controller.process_next().await
    }
}

fn normalize(fragment: &str) -> String {
    if fragment.starts_with('#') {
        fragment.to_string()
    } else {
        format!("#{fragment}")
    }
}
