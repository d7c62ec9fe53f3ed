pub mod workspace_testkit;
