//! # nodeflow: live, parameter-editable processing pipelines
//!
//! A small runtime for composing named, parameterized transforms ("nodes")
//! into a linear pipeline applied to a data container. Pipelines re-run
//! as parameters are edited, keep an append-only provenance log, and contain
//! transform failures instead of propagating them.
//!
//! ## Architecture
//!
//! - **Pipeline**: containers, nodes, node factories, the executor and provenance log
//! - **Controls**: editable controls bound to node parameters (egui or headless)
//! - **Library**: built-in signal, statistics and data-shaping transforms, plus Rhai scripts
//! - **Communication**: a crossbeam channel carries parameter edits to the executor
//!
//! ## Configuration
//!
//! User settings are stored in the platform-appropriate data directory under
//! `dev.nodeflow`:
//!
//! - **Linux**: `~/.local/share/dev.nodeflow/`
//! - **macOS**: `~/Library/Application Support/dev.nodeflow/`
//! - **Windows**: `%APPDATA%\dev.nodeflow\`
//!
//! ## Example
//!
//! ```ignore
//! use nodeflow::{args, library, Container, SessionConfig};
//!
//! let mut container = Container::with_config(table, SessionConfig::headless())
//!     >> library::splice().node(args!["trace", 0, 256])
//!     >> library::normalize().node(args!["spliced"]);
//!
//! let report = container.execute_pipeline(true);
//! println!("{}", container.status());
//! ```

pub mod app;
pub mod config;
pub mod controls;
pub mod error;
pub mod library;
pub mod pipeline;

// Re-export commonly used types
pub use app::NodeflowApp;
pub use config::{SessionConfig, Settings, TempFile};
pub use controls::{ControlBinder, ControlSpec, EguiControlPanel, RecordingBinder};
pub use error::{FlowError, Result, ResultExt};
pub use pipeline::{
    Container, Node, NodeFactory, ParamDescriptor, ParamKind, ParamValue, Params, Payload,
    PipelineStatus, RunReport,
};

/// Positional node arguments: `args!["trace", 0, 256]`.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::pipeline::ParamValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::pipeline::ParamValue::from($value)),+]
    };
}

/// Keyword node arguments: `kwargs! { "stop" => 128 }`.
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::pipeline::Params::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::pipeline::Params::new();
        $(params.insert($name, $crate::pipeline::ParamValue::from($value));)+
        params
    }};
}
