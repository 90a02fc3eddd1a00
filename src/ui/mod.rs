// UI module - main-loop plumbing and the user-action controller

pub mod controller;
pub mod event_loop;

pub use controller::{AppController, Facilities};
pub use event_loop::{MainLoop, UiHandle};
