// SPDX-License-Identifier: MPL-2.0
//! UI interaction trace.

use super::buffer::{BoundedBuffer, BufferCapacity};
use crate::config::ELEMENT_PATH_MAX_DEPTH;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Open key/value details attached to an interaction.
pub type Extra = serde_json::Map<String, serde_json::Value>;

const UNKNOWN_PATH: &str = "unknown";
const PATH_SEPARATOR: &str = " > ";

/// Read-only view of an element in the UI tree.
pub trait DomElement {
    fn tag_name(&self) -> Option<&str>;
    fn id(&self) -> Option<&str>;
    fn class_names(&self) -> Vec<&str>;
    fn parent(&self) -> Option<&dyn DomElement>;
}

/// Owned element chain, as reported by the embedded page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementNode {
    pub tag: Option<String>,
    pub id: Option<String>,
    /// Space-separated class list.
    pub class_name: Option<String>,
    pub parent: Option<Box<ElementNode>>,
}

impl ElementNode {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ElementNode) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }
}

impl DomElement for ElementNode {
    fn tag_name(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn class_names(&self) -> Vec<&str> {
        self.class_name
            .as_deref()
            .map(|names| names.split_whitespace().collect())
            .unwrap_or_default()
    }

    fn parent(&self) -> Option<&dyn DomElement> {
        self.parent.as_deref().map(|parent| parent as &dyn DomElement)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Builds a root-first selector path for `element`, at most
/// [`ELEMENT_PATH_MAX_DEPTH`] levels deep.
///
/// Each level is the lowercased tag plus `#id`, or `.class.names` when there
/// is no id. A missing element, or one without a tag, yields `"unknown"`.
#[must_use]
pub fn element_path(element: Option<&dyn DomElement>) -> String {
    let mut segments = Vec::new();
    let mut current = element;

    while let Some(node) = current {
        let Some(tag) = non_empty(node.tag_name()) else {
            break;
        };
        let mut selector = tag.to_lowercase();
        if let Some(id) = non_empty(node.id()) {
            selector.push('#');
            selector.push_str(id);
        } else {
            let classes = node.class_names();
            if !classes.is_empty() {
                selector.push('.');
                selector.push_str(&classes.join("."));
            }
        }
        segments.push(selector);

        if segments.len() >= ELEMENT_PATH_MAX_DEPTH {
            break;
        }
        current = node.parent();
    }

    if segments.is_empty() {
        return UNKNOWN_PATH.to_string();
    }
    segments.reverse();
    segments.join(PATH_SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// e.g. `click`, `swipe`, `visibility`, `modal_open`.
    pub action: String,
    pub target_path: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub extra: Extra,
}

struct InteractionInner {
    buffer: Mutex<BoundedBuffer<InteractionRecord>>,
    enabled: bool,
}

#[derive(Clone)]
pub struct InteractionRecorder {
    inner: Arc<InteractionInner>,
}

impl fmt::Debug for InteractionRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionRecorder")
            .field("count", &self.count())
            .field("enabled", &self.inner.enabled)
            .finish()
    }
}

impl InteractionRecorder {
    #[must_use]
    pub fn new(capacity: BufferCapacity, enabled: bool) -> Self {
        Self {
            inner: Arc::new(InteractionInner {
                buffer: Mutex::new(BoundedBuffer::new(capacity)),
                enabled,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoundedBuffer<InteractionRecord>> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an interaction on `element`. Does nothing when tracking is off.
    pub fn record(
        &self,
        action: impl Into<String>,
        element: Option<&dyn DomElement>,
        extra: Extra,
    ) {
        if !self.inner.enabled {
            return;
        }
        let record = InteractionRecord {
            action: action.into(),
            target_path: element_path(element),
            captured_at: Utc::now(),
            extra,
        };
        self.lock().push(record);
    }

    #[must_use]
    pub fn all(&self) -> Vec<InteractionRecord> {
        self.lock().all()
    }

    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<InteractionRecord> {
        self.lock().head(n)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
