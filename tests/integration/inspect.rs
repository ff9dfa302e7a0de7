use crate::*;

#[tokio::test]
async fn test_chunk_lookup() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let chunk = server.get_json("/chunk/1").await?;
    assert_eq!(chunk["index"], 1);
    assert_eq!(chunk["matrix"], serde_json::json!([3, 2, 1, 0, 3, 2, 1]));
    assert_eq!(chunk["angle"], 120.0);
    assert_eq!(chunk["timestamp"], 1_100);
    let expected = fano_core::state::derive_seed(&[3, 2, 1, 0, 3, 2, 1], 120.0);
    assert_eq!(chunk["seed"], expected);

    let missing = server.get("/chunk/5").await?;
    assert_eq!(missing.status(), 404);
    assert_eq!(missing.text().await?, "chunk 5 not found");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_fano_points() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let observer = server.get_json("/fano/7").await?;
    assert_eq!(observer["point"], 8);
    assert_eq!(observer["name"], "Observer");
    assert_eq!(observer["hue"], 0);
    assert_eq!(observer["ratio"], 0.0);

    let enoch = server.get_json("/fano/4").await?;
    assert_eq!(enoch["name"], "Enoch");
    assert_eq!(enoch["hue"], 240);

    assert_eq!(server.get("/fano/8").await?.status(), 404);

    server.stop().await;
    Ok(())
}

/// A packet built for a chunk decodes back to the same chunk.
#[tokio::test]
async fn test_packet_encode_then_decode() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let built = server.get_json("/packet/1?dest=42").await?;
    assert_eq!(built["len"], 27);
    let hex = built["hex"].as_str().context("hex field")?.to_string();
    assert_eq!(hex.len(), 54);
    assert!(hex.starts_with("46414e4f01"), "magic and version lead: {hex}");

    let resp = server
        .post("/packet", Some(serde_json::json!({ "hex": hex })))
        .await?;
    assert!(resp.status().is_success());
    let decoded: Value = resp.json().await?;
    assert_eq!(decoded["source_id"], 7);
    assert_eq!(decoded["dest_id"], 42);
    assert_eq!(decoded["matrix"], serde_json::json!([3, 2, 1, 0, 3, 2, 1]));
    assert_eq!(decoded["angle"], 120.0);
    assert_eq!(decoded["fano_point"], 2);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_corrupt_packets_are_rejected() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let built = server.get_json("/packet/2").await?;
    let mut bytes = hex::decode(built["hex"].as_str().context("hex field")?)?;
    bytes[12] ^= 0x01;

    let resp = server
        .post("/packet", Some(serde_json::json!({ "hex": hex::encode(&bytes) })))
        .await?;
    assert_eq!(resp.status(), 422);
    assert!(resp.text().await?.starts_with("invalid packet"));

    let short = server
        .post("/packet", Some(serde_json::json!({ "hex": "46414e4f" })))
        .await?;
    assert_eq!(short.status(), 422);

    let garbage = server
        .post("/packet", Some(serde_json::json!({ "hex": "zz" })))
        .await?;
    assert_eq!(garbage.status(), 400);

    assert_eq!(server.get("/packet/3").await?.status(), 404);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_canon_json_alias() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;
    server.engine.seek(0.5)?;

    assert_eq!(server.get_json("/canon.json").await?, server.status().await?);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_assets_served_as_ndjson() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    // nothing on disk yet
    assert_eq!(server.get("/assets").await?.status(), 404);

    let assets = "{\"id\":\"a\"}\n{\"id\":\"b\"}\n";
    std::fs::write(&server.assets_path, assets)?;

    for path in ["/assets", "/assets.ndjson"] {
        let resp = server.get(path).await?;
        assert_eq!(resp.status(), 200, "{path}");
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(content_type, "application/x-ndjson", "{path}");
        assert_eq!(resp.text().await?, assets, "{path}");
    }

    server.stop().await;
    Ok(())
}
