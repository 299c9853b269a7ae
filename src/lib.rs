pub mod board;
pub mod channel;
pub mod engine;
pub mod error;
pub mod models;
pub mod reorder;
pub mod rest;
pub mod session;

pub use board::{TaskBoard, TaskGroup};
pub use channel::{ChannelConfig, ChannelEvent, ChannelHandle};
pub use engine::{Scope, SyncConfig, SyncEngine};
pub use error::SyncError;
pub use models::{
    CreateTask, Employee, Gender, Notification, Priority, PushEvent, Session, Task, TaskStatus,
    UpdateTask,
};
pub use reorder::DragOutcome;
pub use rest::RestClient;
pub use session::SessionStore;
