pub mod local_artifact_adapter;
