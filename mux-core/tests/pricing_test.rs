/// Pricing file seeding, overrides and remote refresh

#[cfg(test)]
mod tests {
    use mux_core::cost::PricingStore;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_body() -> serde_json::Value {
        json!({
            "openai": {
                "gpt-5.2": {"input": 2.0, "output": 16.0},
                "gpt-5.2-pro": {"input": 20.0, "output": 80.0, "is_estimated": true}
            },
            "google": {"gemini-3-flash-preview": {"input": 0.1, "output": 0.4}},
            "anthropic": {"claude-sonnet-4-5-20250929": {"input": 3.0, "output": 15.0}},
            "_metadata": {"version": "2.1.0"}
        })
    }

    async fn serve(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pricing.json"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_refresh_replaces_table() {
        let dir = TempDir::new().unwrap();
        let store = PricingStore::new(dir.path().join("pricing.yaml"));
        store.load();

        let server = serve(ResponseTemplate::new(200).set_body_json(remote_body())).await;
        let url = format!("{}/pricing.json", server.uri());
        let table = store.refresh_from_remote(&url).await.unwrap();

        let meta = table.metadata.as_ref().unwrap();
        assert_eq!(meta.version, "2.1.0");
        assert_eq!(meta.source, url);
        assert_eq!(table.age_in_days(), Some(0));

        let reloaded = store.load();
        assert_eq!(reloaded, table);
        let gpt = reloaded.get_model_pricing("openai", "gpt-5.2").unwrap();
        assert_eq!(gpt.pricing.input, 2.0);
        // Wholesale replacement: models absent remotely are gone.
        assert!(!reloaded.providers["openai"].contains_key("gpt-4o"));
    }

    #[tokio::test]
    async fn test_refresh_defaults_version() {
        let dir = TempDir::new().unwrap();
        let store = PricingStore::new(dir.path().join("pricing.yaml"));
        let mut body = remote_body();
        body.as_object_mut().unwrap().remove("_metadata");

        let server = serve(ResponseTemplate::new(200).set_body_json(body)).await;
        let table = store
            .refresh_from_remote(&format!("{}/pricing.json", server.uri()))
            .await
            .unwrap();
        assert_eq!(table.metadata.unwrap().version, "1.0.0");
    }

    async fn assert_fails_closed(template: ResponseTemplate) {
        let dir = TempDir::new().unwrap();
        let store = PricingStore::new(dir.path().join("pricing.yaml"));
        store.load();
        let before = fs::read(store.path()).unwrap();

        let server = serve(template).await;
        let result = store
            .refresh_from_remote(&format!("{}/pricing.json", server.uri()))
            .await;

        assert!(result.is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_provider_fails_closed() {
        let mut body = remote_body();
        body.as_object_mut().unwrap().remove("anthropic");
        assert_fails_closed(ResponseTemplate::new(200).set_body_json(body)).await;
    }

    #[tokio::test]
    async fn test_server_error_fails_closed() {
        assert_fails_closed(ResponseTemplate::new(500).set_body_string("oops")).await;
    }

    #[tokio::test]
    async fn test_malformed_json_fails_closed() {
        assert_fails_closed(ResponseTemplate::new(200).set_body_string("{\"openai\": ")).await;
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_closed() {
        let dir = TempDir::new().unwrap();
        let store = PricingStore::new(dir.path().join("pricing.yaml"));
        store.load();
        let before = fs::read(store.path()).unwrap();

        // Nothing listens on port 9 locally.
        assert!(store.refresh_from_remote("http://127.0.0.1:9/pricing.json").await.is_err());
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_override_without_default_model_still_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.yaml");
        fs::write(
            &path,
            "anthropic:\n  claude-3-haiku-20240307:\n    input: 0.3\n    output: 1.5\n\
             _metadata:\n  last_updated: '2025-01-01T00:00:00+00:00'\n  version: '1.0.0'\n  source: manual\n",
        )
        .unwrap();

        let store = PricingStore::new(&path);
        let haiku = store.get_model_pricing("anthropic", "claude-3-haiku-20240307").unwrap();
        assert_eq!(haiku.pricing.input, 0.3);
        assert!(!haiku.fallback);

        let opus = store.get_model_pricing("anthropic", "claude-3-opus-20240229").unwrap();
        assert!(opus.fallback);
        assert_eq!(opus.priced_as, "claude-sonnet-4-5-20250929");
        assert_eq!(opus.pricing.input, 3.0);

        let age = store.age_in_days().unwrap();
        assert!(age > 30);
    }

    #[test]
    fn test_corrupt_file_is_reseeded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pricing.yaml");
        fs::write(&path, ":: not yaml ::\n  - [").unwrap();

        let table = PricingStore::new(&path).load();
        assert_eq!(table.metadata.unwrap().source, "embedded_defaults");
        assert!(fs::read_to_string(&path).unwrap().contains("embedded_defaults"));
    }
}
