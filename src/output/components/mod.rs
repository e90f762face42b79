mod breakdown_table;
mod gate_table;
mod history_table;
mod run_panel;
mod status_table;

pub use breakdown_table::BreakdownTable;
pub use gate_table::GateTable;
pub use history_table::HistoryTable;
pub use run_panel::RunPanel;
pub use status_table::StatusTable;
