use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque per-instance annotation data, e.g. a link target.
pub type Payload = serde_json::Value;

/// Shared handle to an annotation instance. Clones keep the same identity.
pub type AnnotationRef = Arc<Annotation>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an annotation instance, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

impl AnnotationId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed formatting marker applied to a run of characters.
///
/// Two annotations with equal `kind` and `data` are still distinct
/// instances; only [`Annotation::id`] is used to tell them apart.
#[derive(Debug)]
pub struct Annotation {
    id: AnnotationId,
    kind: String,
    data: Payload,
}

impl Annotation {
    /// Create a new instance with a fresh identity and no payload.
    pub fn new(kind: impl Into<String>) -> AnnotationRef {
        Self::with_data(kind, Payload::Null)
    }

    /// Create a new instance with a fresh identity carrying `data`.
    pub fn with_data(kind: impl Into<String>, data: Payload) -> AnnotationRef {
        Arc::new(Self {
            id: AnnotationId::next(),
            kind: kind.into(),
            data,
        })
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }
}

/// One character plus the annotation instances applied to it, in
/// application order.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    pub ch: char,
    pub annotations: Vec<AnnotationRef>,
}

impl ContentUnit {
    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            annotations: Vec::new(),
        }
    }

    pub fn annotated(ch: char, annotations: Vec<AnnotationRef>) -> Self {
        Self { ch, annotations }
    }

    /// A unit with no annotations at all.
    pub fn is_plain(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Build plain units for every character of `text`.
pub fn plain_units(text: &str) -> Vec<ContentUnit> {
    text.chars().map(ContentUnit::plain).collect()
}
