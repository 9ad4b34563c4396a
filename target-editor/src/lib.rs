pub mod app;
pub mod editor;
pub mod logging;
pub mod report;
pub mod settings;

pub use editor::{
    EditorContext, EditorError, EditorStatus, GridEditor, LoadJob, Notice, SaveJob, YearSwitch,
};
pub use settings::Settings;
