//! # Vantage Viewer
//!
//! Opens a viewport and loads every model path given on the command line.
//!
//! ```bash
//! cargo run --example viewer -- path/to/model.obj other.glb
//! ```
//!
//! Controls:
//! - `W`/`A`/`S`/`D` walk, `Space`/`Shift` rise and sink
//! - hold the left mouse button to look around
//! - click a loaded model to select it, drag a gizmo handle to move it
//! - `Escape` quits

use vantage::prelude::*;

fn main() -> anyhow::Result<()> {
    let mut app = VantageApp::new()?;

    for path in std::env::args().skip(1) {
        app.add_model(path);
    }

    app.lifecycle_mut().add_selection_observer(|change| match change {
        SelectionChange::Selected(node) => log::info!("Selected {node:?}"),
        SelectionChange::Cleared => log::info!("Selection cleared"),
        SelectionChange::Transformed(_) => {}
    });

    app.run()
}
