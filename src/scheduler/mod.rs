pub mod rescan;
