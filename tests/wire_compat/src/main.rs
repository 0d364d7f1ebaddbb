fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use s3deck_objects::{Content, TransferRequest};
    use s3deck_protocol::constants::{KEY_AWS_CREDENTIALS, KEY_REFRESH_TOKEN, TransferDirection};
    use s3deck_protocol::envelope::ChannelMessage;
    use s3deck_protocol::{AwsCredentials, CognitoSetting, ProgressEventType, ProgressPayload};
    use s3deck_settings::{JsonFileStore, SettingsExt, SettingsStore};
    use s3deck_transfer::{Transfer, TransferEvent, TransferStatus};

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into `T`, re-serializes it and compares the
    /// JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  expected: {fixture}\n  actual:   {reserialized}"
        );
        parsed
    }

    // --- Engine progress payloads ---

    #[test]
    fn fixture_progress_start() {
        let p: ProgressPayload = roundtrip_test("progress_start.json");
        assert_eq!(p.event_type, ProgressEventType::Start);
        assert_eq!(p.transfer_id, "0b6f3c1e-upload");

        let event = TransferEvent::from_payload(TransferDirection::Upload, p).unwrap();
        assert_eq!(event.id(), "0b6f3c1e-upload");
    }

    #[test]
    fn fixture_progress_failed() {
        let p: ProgressPayload = roundtrip_test("progress_failed.json");
        assert_eq!(p.event_type, ProgressEventType::Failed);
        assert_eq!(p.error.as_deref(), Some("connection reset by peer"));
        assert!(p.file_path.is_none());
    }

    #[test]
    fn fixture_channel_message() {
        let msg: ChannelMessage = serde_json::from_str(&read_fixture("channel_message.json")).unwrap();
        assert_eq!(msg.channel, "download-progress");

        let reserialized = serde_json::to_value(&msg).unwrap();
        assert_eq!(reserialized, load_fixture("channel_message.json"));

        let event = TransferEvent::from_message(&msg).unwrap();
        assert_eq!(event.id(), "d-7");
    }

    // --- Persisted settings ---

    #[test]
    fn fixture_settings_file() {
        let store = JsonFileStore::new(fixtures_dir().join("settings_file.json")).unwrap();

        let setting = store.cognito_setting().unwrap().unwrap();
        assert_eq!(setting.user_pool_id, "ap-northeast-1_Example");
        assert_eq!(
            setting.login_provider(),
            "cognito-idp.ap-northeast-1.amazonaws.com/ap-northeast-1_Example"
        );
        assert_eq!(
            store.download_path().unwrap().as_deref(),
            Some("/home/alice/Downloads")
        );
        assert_eq!(
            store.get_as::<String>(KEY_REFRESH_TOKEN).unwrap().as_deref(),
            Some("eyJjdHkiOiJKV1Qi")
        );

        let creds: AwsCredentials = store.get_as(KEY_AWS_CREDENTIALS).unwrap().unwrap();
        assert_eq!(creds.identity_id, "ap-northeast-1:0f1e2d3c");
        assert_eq!(
            serde_json::to_value(&creds).unwrap(),
            store.get(KEY_AWS_CREDENTIALS).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&setting).unwrap(),
            load_fixture("settings_file.json")["cognitoSetting"]
        );
    }

    #[test]
    fn credentials_accept_engine_field_names() {
        let json = r#"{"access_key_id":"A","secret_access_key":"S","session_token":"T","identity_id":"I"}"#;
        let creds: AwsCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.access_key_id, "A");
        assert_eq!(creds.identity_id, "I");
    }

    // --- Object browser and engine requests ---

    #[test]
    fn fixture_transfer_request() {
        let req: TransferRequest = roundtrip_test("transfer_request.json");
        assert_eq!(req.credentials.access_key_id, "ASIAEXAMPLE");
        assert!(req.key.ends_with('/'));
    }

    #[test]
    fn fixture_contents() {
        let contents: Vec<Content> = roundtrip_test("contents.json");
        assert!(!contents[0].is_folder());
        assert!(contents[1].is_folder());
    }

    #[test]
    fn fixture_cognito_setting_fields() {
        let setting: CognitoSetting =
            serde_json::from_value(load_fixture("settings_file.json")["cognitoSetting"].clone())
                .unwrap();
        assert_eq!(setting.bucket, "s3deck-bucket");
    }

    // --- Registry views ---

    #[test]
    fn fixture_transfer_finished() {
        let t: Transfer = roundtrip_test("transfer_finished.json");
        assert_eq!(t.status, TransferStatus::Finished);
        assert!(t.finished_at.is_some());
        assert!(t.error.is_none());
    }

    #[test]
    fn fixture_transfer_failed() {
        let t: Transfer = roundtrip_test("transfer_failed.json");
        assert_eq!(t.status, TransferStatus::Failed);
        assert_eq!(t.direction, TransferDirection::Download);
        assert!(t.finished_at.is_none());
    }
}
