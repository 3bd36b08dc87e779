#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.params.epochs, 100);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molfuse.toml");
        std::fs::write(
            &path,
            r#"
[embeddings]
graph_source = "gnn_run"

[training]
epochs = 7
seed = 3

[device]
prefer = "cpu"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.embeddings.graph_source, "gnn_run");
        assert_eq!(config.embeddings.lm_source, default_lm_source());
        assert_eq!(config.training.params.epochs, 7);
        assert_eq!(config.training.params.batch_size, 64);
        assert_eq!(config.training.seed, 3);
        assert_eq!(config.device.prefer, DevicePreference::Cpu);
        assert_eq!(config.paths, RunPaths::default());
    }

    #[test]
    fn test_invalid_training_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molfuse.toml");
        std::fs::write(&path, "[training]\nbatch_size = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let example = include_str!("../../../../molfuse.example.toml");
        let config: Config = toml::from_str(example).unwrap();
        assert_eq!(config.training.params.hidden_dims, vec![256, 64]);
    }
}
