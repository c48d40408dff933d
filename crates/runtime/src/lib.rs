//! Browser plumbing for the gateway: locating a Chromium-family
//! executable and driving WhatsApp Web through chromiumoxide.

pub mod chromium;
mod js;
pub mod locator;

pub use chromium::ChromiumClient;
pub use locator::ExecutableLocator;
