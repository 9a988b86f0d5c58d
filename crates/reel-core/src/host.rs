//! Host environment traits
//!
//! The page an embed lives in is reached only through these traits, so the
//! same lifecycle runs against a browser binding, the headless host, or a
//! test double.

use std::rc::Rc;

use crate::bootstrap::ScriptElement;
use crate::events::ListenerId;

/// Document-level services shared by every embed
pub trait Document {
    /// Append a script element; the host reports completion to the
    /// bootstrap registry
    fn append_script(&self, script: &ScriptElement);

    /// Register a window resize listener
    fn add_resize_listener(&self, listener: Rc<dyn Fn()>) -> ListenerId;

    /// Remove a resize listener registered earlier
    fn remove_resize_listener(&self, id: ListenerId);
}

/// The element an embed is attached to
pub trait HostElement {
    /// Current rendered height in CSS pixels
    fn bounding_height(&self) -> f64;
}
