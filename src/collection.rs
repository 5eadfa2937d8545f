//! Named routes sharing one origin/destination selection, and the payload
//! submitted for them.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::buffer::{RouteKind, RouteState};
use crate::editor::{EditorConfig, RouteEditor};
use crate::error::{CollectionError, EditError};
use crate::geo::GeoPoint;
use crate::places::NamedPlace;
use crate::traits::{LineStyle, MapSurface};

/// One route as sent to the booking backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub route_name: String,
    pub price: f64,
    pub message: String,
    pub polyline: Vec<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionWarning {
    /// The route was not finished and is not part of the payload.
    SkippedRoute { name: String, state: RouteState },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub records: Vec<SubmissionRecord>,
    pub warnings: Vec<SubmissionWarning>,
}

impl Submission {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.records)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    editor: RouteEditor,
    message: String,
}

#[derive(Debug, Clone)]
pub struct RouteCollection {
    origin: NamedPlace,
    destination: Option<NamedPlace>,
    routes: Vec<Entry>,
    active: Option<String>,
    shared_price: Option<f64>,
    config: EditorConfig,
}

impl RouteCollection {
    /// Routes from `origin` to a distinct `destination`.
    pub fn straight(origin: NamedPlace, destination: NamedPlace) -> Self {
        Self::with_places(origin, Some(destination))
    }

    /// Routes that finish where they started.
    pub fn looped(origin: NamedPlace) -> Self {
        Self::with_places(origin, None)
    }

    fn with_places(origin: NamedPlace, destination: Option<NamedPlace>) -> Self {
        Self {
            origin,
            destination,
            routes: Vec::new(),
            active: None,
            shared_price: None,
            config: EditorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn origin(&self) -> &NamedPlace {
        &self.origin
    }

    pub fn destination(&self) -> Option<&NamedPlace> {
        self.destination.as_ref()
    }

    pub fn is_loop(&self) -> bool {
        self.destination.is_none()
    }

    pub fn shared_price(&self) -> Option<f64> {
        self.shared_price
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Route names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|entry| entry.editor.name())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route(&self, name: &str) -> Option<&RouteEditor> {
        self.find(name).map(|index| &self.routes[index].editor)
    }

    pub fn route_mut(&mut self, name: &str) -> Option<&mut RouteEditor> {
        let index = self.find(name)?;
        Some(&mut self.routes[index].editor)
    }

    pub fn active(&self) -> Option<&RouteEditor> {
        self.active.as_deref().and_then(|name| self.route(name))
    }

    pub fn active_mut(&mut self) -> Result<&mut RouteEditor, CollectionError> {
        let name = self.active.clone().ok_or(CollectionError::NoActiveRoute)?;
        self.route_mut(&name).ok_or(CollectionError::UnknownRoute(name))
    }

    /// Adds a route, makes it active and starts drawing it.
    pub fn create_route(&mut self, name: &str, surface: &mut dyn MapSurface) -> Result<&mut RouteEditor, CollectionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CollectionError::EmptyName);
        }
        if self.find(name).is_some() {
            return Err(CollectionError::DuplicateRoute(name.to_string()));
        }

        let kind = match &self.destination {
            Some(destination) => RouteKind::Straight {
                origin: self.origin.position,
                destination: destination.position,
            },
            None => RouteKind::Loop,
        };
        let mut editor = RouteEditor::new(name, kind, self.config.clone());
        editor.start(surface).map_err(|source| CollectionError::Edit {
            route: name.to_string(),
            source,
        })?;

        self.restyle_active(LineStyle::Inactive, surface);
        self.routes.push(Entry {
            editor,
            message: String::new(),
        });
        self.active = Some(name.to_string());
        debug!(route = name, total = self.routes.len(), "created route");

        let index = self.routes.len() - 1;
        Ok(&mut self.routes[index].editor)
    }

    pub fn switch_active(&mut self, name: &str, surface: &mut dyn MapSurface) -> Result<(), CollectionError> {
        let name = name.trim();
        if self.find(name).is_none() {
            return Err(CollectionError::UnknownRoute(name.to_string()));
        }
        self.restyle_active(LineStyle::Inactive, surface);
        self.active = Some(name.to_string());
        self.restyle_active(LineStyle::Active, surface);
        Ok(())
    }

    /// Removes a route and its visuals. Other routes keep their names.
    pub fn delete_route(&mut self, name: &str, surface: &mut dyn MapSurface) -> Result<(), CollectionError> {
        let name = name.trim();
        let index = self
            .find(name)
            .ok_or_else(|| CollectionError::UnknownRoute(name.to_string()))?;
        let mut entry = self.routes.remove(index);
        entry.editor.clear(surface);

        if self.active.as_deref() == Some(name) {
            self.active = self
                .routes
                .first()
                .map(|entry| entry.editor.name().to_string());
            self.restyle_active(LineStyle::Active, surface);
        }
        debug!(route = name, remaining = self.routes.len(), "deleted route");
        Ok(())
    }

    /// Sets the single price applied to every route in the collection.
    pub fn set_shared_price(&mut self, value: f64) -> Result<(), CollectionError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(CollectionError::InvalidPrice(value));
        }
        self.shared_price = Some(value);
        Ok(())
    }

    pub fn set_message(&mut self, name: &str, message: impl Into<String>) -> Result<(), CollectionError> {
        let index = self
            .find(name)
            .ok_or_else(|| CollectionError::UnknownRoute(name.to_string()))?;
        self.routes[index].message = message.into();
        Ok(())
    }

    /// One record per finished route. Unfinished routes are reported as
    /// warnings rather than silently dropped.
    pub fn serialize_for_submission(&self) -> Result<Submission, CollectionError> {
        let price = self.shared_price.ok_or(CollectionError::PriceNotSet)?;
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        for entry in &self.routes {
            let editor = &entry.editor;
            if editor.state() == RouteState::Finished {
                records.push(SubmissionRecord {
                    route_name: editor.name().to_string(),
                    price,
                    message: entry.message.clone(),
                    polyline: editor.dense().points().to_vec(),
                });
            } else {
                warn!(route = editor.name(), state = ?editor.state(), "route not finished, left out of submission");
                warnings.push(SubmissionWarning::SkippedRoute {
                    name: editor.name().to_string(),
                    state: editor.state(),
                });
            }
        }

        Ok(Submission { records, warnings })
    }

    /// Checks every route buffer. Buffers are independent, so this runs in
    /// parallel.
    pub fn check_invariants(&self) -> Result<(), CollectionError> {
        self.routes
            .par_iter()
            .map(|entry| {
                entry
                    .editor
                    .check_invariants()
                    .map_err(|source: EditError| CollectionError::Edit {
                        route: entry.editor.name().to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<()>, CollectionError>>()
            .map(|_| ())
    }

    /// Names are stored trimmed, so lookups trim too.
    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.routes
            .iter()
            .position(|entry| entry.editor.name() == name)
    }

    fn restyle_active(&mut self, style: LineStyle, surface: &mut dyn MapSurface) {
        let Some(name) = self.active.clone() else {
            return;
        };
        if let Some(editor) = self.route_mut(&name) {
            editor.set_style(style, surface);
        }
    }
}
