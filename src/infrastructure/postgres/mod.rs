pub mod postgres_cli_adapter;
