//! End-to-end tests for the storage facades.
//!
//! Every test builds one or more "machines": contexts that share the record
//! store, JSON store and remote directory but own a separate local cache.

use std::fs;
use std::sync::Arc;

use modelfs::records::DtypeDict;
use modelfs::{
    normalize_name, IntegrationRecord, JsonMap, LocalProvider, PredictorRecord, ResourceStorage,
    SqliteJsonStore, SqliteRecordStore, StorageContext,
};
use serde_json::{json, Value};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Cluster {
    temp: TempDir,
    records: Arc<SqliteRecordStore>,
    json: Arc<SqliteJsonStore>,
}

impl Cluster {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp = TempDir::new()?;
        let records = Arc::new(SqliteRecordStore::open(&temp.path().join("records.db"))?);
        let json = Arc::new(SqliteJsonStore::open(&temp.path().join("records.db"))?);
        records.insert_predictor(&PredictorRecord::new(1, "churn"))?;
        records.insert_integration(&IntegrationRecord::new(2, "warehouse", "postgres"))?;
        Ok(Self {
            temp,
            records,
            json,
        })
    }

    fn machine(&self, name: &str) -> StorageContext {
        StorageContext::new(
            self.records.clone(),
            self.json.clone(),
            Arc::new(LocalProvider::new(self.temp.path().join("remote"))),
            self.temp.path().join(name),
        )
        .with_company_id(7)
    }
}

fn object(value: Value) -> JsonMap {
    value.as_object().cloned().expect("JSON object")
}

// ===========================================================================
// Predictor storage
// ===========================================================================

mod predictor {
    use super::*;

    #[test]
    fn test_data_merge_then_status_replace() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").model_storage(1)?;

        storage.update_data(object(json!({"accuracy": 0.9})))?;
        storage.update_data(object(json!({"rows": 1000})))?;
        assert_eq!(
            storage.get_info()?.data,
            Some(json!({"accuracy": 0.9, "rows": 1000}))
        );

        storage.status_set("error", Some(json!({"error": "boom"})))?;
        let info = storage.get_info()?;
        assert_eq!(info.status.as_deref(), Some("error"));
        assert_eq!(info.data, Some(json!({"error": "boom"})));
        Ok(())
    }

    #[test]
    fn test_training_state_visible_to_other_machine() -> TestResult {
        let cluster = Cluster::new()?;
        let trainer = cluster.machine("node-a").model_storage(1)?;
        let observer = cluster.machine("node-b").model_storage(1)?;

        trainer.training_state_set(Some(0), Some(3), Some("preparing"))?;
        trainer.training_state_set(Some(1), None, Some("fitting"))?;

        let phase = observer.training_state_get()?;
        assert_eq!(phase.current, Some(1));
        assert_eq!(phase.total, Some(3));
        assert_eq!(phase.name.as_deref(), Some("fitting"));
        Ok(())
    }

    #[test]
    fn test_columns_set_overwrites() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").model_storage(1)?;

        storage.columns_set(DtypeDict::from([
            ("age".to_string(), "integer".to_string()),
            ("city".to_string(), "categorical".to_string()),
        ]))?;
        storage.columns_set(DtypeDict::from([(
            "age".to_string(),
            "float".to_string(),
        )]))?;

        let columns = storage.columns_get()?.expect("columns were set");
        assert_eq!(columns.len(), 1);
        assert_eq!(columns.get("age").map(String::as_str), Some("float"));
        Ok(())
    }

    #[test]
    fn test_artifact_written_on_one_machine_read_on_another() -> TestResult {
        let cluster = Cluster::new()?;
        let writer = cluster.machine("node-a").model_storage(1)?;
        let reader = cluster.machine("node-b").model_storage(1)?;

        writer.file_set("model.bin", b"weights-v1")?;
        assert_eq!(reader.file_get("model.bin")?, Some(b"weights-v1".to_vec()));

        writer.file_set("model.bin", b"weights-v2-longer")?;
        assert_eq!(
            reader.file_get("model.bin")?,
            Some(b"weights-v2-longer".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_folder_round_trip_between_machines() -> TestResult {
        let cluster = Cluster::new()?;
        let writer = cluster.machine("node-a").model_storage(1)?;
        let reader = cluster.machine("node-b").model_storage(1)?;

        let folder = writer.folder_get("Checkpoints")?;
        assert!(folder.ends_with(normalize_name("Checkpoints")));
        fs::write(folder.join("epoch_1.ckpt"), b"one")?;
        writer.folder_sync("Checkpoints")?;

        let pulled = reader.folder_get("checkpoints")?;
        assert_eq!(fs::read(pulled.join("epoch_1.ckpt"))?, b"one");
        Ok(())
    }

    #[test]
    fn test_unsynced_folder_stays_local() -> TestResult {
        let cluster = Cluster::new()?;
        let writer = cluster.machine("node-a").model_storage(1)?;
        let reader = cluster.machine("node-b").model_storage(1)?;

        let folder = writer.folder_get("scratch")?;
        fs::write(folder.join("draft.txt"), b"draft")?;

        let pulled = reader.folder_get("scratch")?;
        assert!(!pulled.join("draft.txt").exists());
        Ok(())
    }

    #[test]
    fn test_json_values_are_scoped_per_predictor() -> TestResult {
        let cluster = Cluster::new()?;
        cluster
            .records
            .insert_predictor(&PredictorRecord::new(3, "other"))?;
        let context = cluster.machine("node-a");
        let first = context.model_storage(1)?;
        let second = context.model_storage(3)?;

        first.json_set("metrics", &json!({"r2": 0.8}))?;
        assert_eq!(first.json_get("metrics")?, Some(json!({"r2": 0.8})));
        assert_eq!(second.json_get("metrics")?, None);

        first.json_set("metrics", &json!({"r2": 0.85}))?;
        assert_eq!(first.json_get("metrics")?, Some(json!({"r2": 0.85})));
        Ok(())
    }

    #[test]
    fn test_delete_clears_local_remote_and_json() -> TestResult {
        let cluster = Cluster::new()?;
        let node_a = cluster.machine("node-a").model_storage(1)?;
        node_a.file_set("model.bin", b"weights")?;
        node_a.json_set("metrics", &json!(1))?;

        node_a.delete()?;

        let node_b = cluster.machine("node-b").model_storage(1)?;
        assert_eq!(node_b.file_get("model.bin")?, None);
        assert_eq!(node_b.json_get("metrics")?, None);
        assert_eq!(node_b.get_info()?.data, None);
        Ok(())
    }

    #[test]
    fn test_file_del_cannot_escape_predictor_folder() -> TestResult {
        let cluster = Cluster::new()?;
        cluster
            .records
            .insert_predictor(&PredictorRecord::new(2, "neighbour"))?;
        let context = cluster.machine("node-a");
        let first = context.model_storage(1)?;
        let neighbour = context.model_storage(2)?;
        first.file_set("own.bin", b"own")?;
        neighbour.file_set("weights.bin", b"w")?;

        for name in ["..", "../predictor_7_2", "nested/../.."] {
            assert!(first.file_del(name).unwrap_err().is_invalid_name());
        }

        assert!(neighbour
            .file_storage()
            .folder_path()
            .join("weights.bin")
            .exists());
        let elsewhere = cluster.machine("node-b");
        assert_eq!(
            elsewhere.model_storage(2)?.file_get("weights.bin")?,
            Some(b"w".to_vec())
        );
        assert_eq!(
            elsewhere.model_storage(1)?.file_get("own.bin")?,
            Some(b"own".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_removed_record_reports_not_found() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").model_storage(99)?;

        let err = storage.get_info().unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Predictor 99 not found");
        assert!(storage.status_set("complete", None).unwrap_err().is_not_found());
        Ok(())
    }
}

// ===========================================================================
// Integration storage
// ===========================================================================

mod integration {
    use super::*;

    #[test]
    fn test_connection_args_replace_not_merge() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").handler_storage(2, None, false)?;

        storage.update_connection_args(object(json!({"host": "db", "port": 5432})))?;
        storage.update_connection_args(object(json!({"password": "secret"})))?;

        let args = storage.get_connection_args()?;
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("password"), Some(&json!("secret")));
        Ok(())
    }

    #[test]
    fn test_file_names_normalized_across_machines() -> TestResult {
        let cluster = Cluster::new()?;
        let writer = cluster.machine("node-a").handler_storage(2, None, false)?;
        let reader = cluster.machine("node-b").handler_storage(2, None, false)?;

        writer.file_set("Client Cert.pem", b"CERT")?;
        assert_eq!(reader.file_get("client cert.pem")?, Some(b"CERT".to_vec()));
        assert_eq!(reader.file_list()?, vec![normalize_name("Client Cert.pem")]);
        Ok(())
    }

    #[test]
    fn test_temporal_instance_never_publishes() -> TestResult {
        let cluster = Cluster::new()?;
        let temporal = cluster.machine("node-a").handler_storage(2, None, true)?;
        let persistent = cluster.machine("node-b").handler_storage(2, None, false)?;

        temporal.file_set("token", b"abc")?;
        let folder = temporal.folder_get("")?;
        fs::write(folder.join("cache.db"), b"cache")?;
        temporal.folder_sync("")?;

        assert_eq!(persistent.file_get("token")?, None);
        assert!(persistent.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_temporal_delete_purges_remote_too() -> TestResult {
        let cluster = Cluster::new()?;
        let persistent = cluster.machine("node-a").handler_storage(2, None, false)?;
        persistent.file_set("token", b"abc")?;

        let temporal = cluster.machine("node-b").handler_storage(2, None, true)?;
        assert_eq!(temporal.file_get("token")?, Some(b"abc".to_vec()));
        temporal.delete()?;

        assert_eq!(temporal.file_get("token")?, None);
        let fresh = cluster.machine("node-c").handler_storage(2, None, false)?;
        assert_eq!(fresh.file_get("token")?, None);
        Ok(())
    }

    #[test]
    fn test_export_import_preserves_tree() -> TestResult {
        let cluster = Cluster::new()?;
        let source = cluster.machine("node-a").handler_storage(2, None, false)?;
        let folder = source.folder_get("")?;
        fs::create_dir_all(folder.join("keys").join("prod"))?;
        fs::write(folder.join("keys").join("prod").join("id_rsa"), b"private")?;
        fs::write(folder.join("settings.ini"), b"[main]")?;

        let archive = source.export_files()?.expect("folder has files");

        cluster
            .records
            .insert_integration(&IntegrationRecord::new(5, "copy", "postgres"))?;
        let target = cluster.machine("node-b").handler_storage(5, None, false)?;
        assert!(target.is_empty()?);
        assert_eq!(target.import_files(&archive)?, 2);
        assert!(!target.is_empty()?);

        let restored = cluster
            .machine("node-c")
            .handler_storage(5, None, false)?
            .folder_get("")?;
        assert_eq!(
            fs::read(restored.join("keys").join("prod").join("id_rsa"))?,
            b"private"
        );
        assert_eq!(fs::read(restored.join("settings.ini"))?, b"[main]");
        Ok(())
    }

    #[test]
    fn test_export_of_empty_integration() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").handler_storage(2, None, false)?;
        assert!(storage.is_empty()?);
        assert!(storage.export_files()?.is_none());
        Ok(())
    }

    #[test]
    fn test_import_rejects_garbage() -> TestResult {
        let cluster = Cluster::new()?;
        let storage = cluster.machine("node-a").handler_storage(2, None, false)?;
        assert!(storage.import_files(b"definitely not a zip").is_err());
        Ok(())
    }

    #[test]
    fn test_custom_root_dir_is_separate() -> TestResult {
        let cluster = Cluster::new()?;
        let context = cluster.machine("node-a");
        let staged = context.handler_storage(2, Some("staging"), false)?;
        let regular = context.handler_storage(2, None, false)?;

        let folder = staged.folder_get("")?;
        fs::write(folder.join("upload.csv"), b"a,b")?;

        assert!(!staged.is_empty()?);
        assert!(regular.is_empty()?);
        Ok(())
    }
}
