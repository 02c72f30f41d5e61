use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

/// User-visible, auto-dismissing conditions raised at the boundary where they originate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The archive catalogue could not be reached; stored articles stay usable
    Offline,
    /// A durable write failed even after eviction
    StorageExhausted,
    NarrationUnsupported,
    NarrationError(String),
    BoundaryReached(Boundary),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Offline => write!(f, "Could not load new articles. Offline mode active."),
            Notice::StorageExhausted => {
                write!(f, "Storage is full. Changes are kept for this session only.")
            }
            Notice::NarrationUnsupported => write!(f, "Narration is not available here."),
            Notice::NarrationError(msg) => write!(f, "Narration stopped: {}", msg),
            Notice::BoundaryReached(Boundary::Start) => write!(f, "This is the first article."),
            Notice::BoundaryReached(Boundary::End) => write!(f, "No more articles."),
        }
    }
}
