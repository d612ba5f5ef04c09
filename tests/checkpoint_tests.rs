use chrono::NaiveDate;
use layermem::feedback::{AccessFeedbackMulti, AccessMulti, FeedbackSignal};
use layermem::memory::{
    EngineConfig, EngineError, EnginePolicies, HashingEmbedder, MemoryEngine, QueryRequest, Tier,
};
use layermem::CheckpointError;
use tempfile::tempdir;

const DIM: usize = 24;
const SYMBOLS: [&str; 2] = ["BTC-USD", "ETH-USD"];

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 3, d).unwrap()
}

fn embedder() -> Box<HashingEmbedder> {
    Box::new(HashingEmbedder::new(DIM))
}

fn populated_engine() -> MemoryEngine {
    let mut config = EngineConfig {
        embedding_dimension: DIM,
        ..EngineConfig::new(SYMBOLS)
    };
    config.short.importance_init = 0.85;
    config.short.capacity = Some(8);
    let mut engine = MemoryEngine::new(config, embedder()).unwrap();

    let news = [
        ("exchange outflows rise", "BTC-USD"),
        ("staking yields compress", "ETH-USD"),
        ("miners sell reserves", "BTC-USD"),
        ("l2 fees fall", "ETH-USD"),
    ];
    for (d, (text, symbol)) in news.iter().enumerate() {
        let date = day(1 + d as u32);
        engine.ingest(text, date, Some(symbol)).unwrap();
        engine.step(date).unwrap();
    }
    engine
        .ingest_reflection("held through volatility", day(4), Some("BTC-USD"))
        .unwrap();
    engine.apply_feedback(AccessFeedbackMulti {
        records: vec![
            AccessMulti {
                symbol: "ETH-USD".into(),
                id: 0,
                feedback: FeedbackSignal::Negative,
            },
            AccessMulti {
                symbol: "BTC-USD".into(),
                id: 1,
                feedback: FeedbackSignal::Positive,
            },
        ],
    });
    engine.ingest("etf decision delayed", day(5), Some("BTC-USD")).unwrap();
    engine
}

#[test]
fn test_round_trip_preserves_queries() -> Result<(), EngineError> {
    let temp_dir = tempdir().map_err(CheckpointError::from)?;
    let engine = populated_engine();
    assert!(!engine.store(Tier::Mid).is_empty());

    engine.save_checkpoint(temp_dir.path())?;
    for name in ["short", "mid", "long", "reflection", "engine"] {
        assert!(temp_dir.path().join(format!("{}.bin", name)).exists());
    }

    let loaded = MemoryEngine::load_checkpoint(temp_dir.path(), embedder())?;
    assert_eq!(loaded.stats(), engine.stats());
    assert_eq!(loaded.config(), engine.config());

    let request = QueryRequest::new(day(5)).with_top_k(3, 3, 3, 3);
    assert_eq!(loaded.query(&request)?, engine.query(&request)?);
    let with_context = request.with_context("bitcoin etf");
    assert_eq!(loaded.query(&with_context)?, engine.query(&with_context)?);
    Ok(())
}

#[test]
fn test_loaded_engine_behaves_identically() -> Result<(), EngineError> {
    let temp_dir = tempdir().map_err(CheckpointError::from)?;
    let mut saved = populated_engine();
    saved.save_checkpoint(temp_dir.path())?;
    let mut loaded = MemoryEngine::load_checkpoint(temp_dir.path(), embedder())?;

    for engine in [&mut saved, &mut loaded] {
        let id = engine.ingest("hashrate record", day(6), Some("BTC-USD"))?;
        // fresh ids continue after the saved ones
        assert_eq!(id, 4);
        engine.step(day(6))?;
        engine.step(day(7))?;
    }

    assert_eq!(loaded.stats(), saved.stats());
    let request = QueryRequest::new(day(7)).for_symbols(["BTC-USD"]);
    assert_eq!(loaded.query(&request)?, saved.query(&request)?);
    Ok(())
}

#[test]
fn test_load_with_custom_policies() -> Result<(), EngineError> {
    let temp_dir = tempdir().map_err(CheckpointError::from)?;
    let engine = populated_engine();
    engine.save_checkpoint(temp_dir.path())?;

    let policies = EnginePolicies::from_config(engine.config());
    let loaded = MemoryEngine::load_checkpoint_with_policies(temp_dir.path(), embedder(), policies)?;
    assert_eq!(loaded.stats(), engine.stats());
    Ok(())
}

#[test]
fn test_missing_checkpoint() {
    let temp_dir = tempdir().unwrap();
    let result = MemoryEngine::load_checkpoint(temp_dir.path().join("nowhere"), embedder());
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::Missing(_)))
    ));
}

#[test]
fn test_missing_tier_file() {
    let temp_dir = tempdir().unwrap();
    populated_engine().save_checkpoint(temp_dir.path()).unwrap();
    std::fs::remove_file(temp_dir.path().join("long.bin")).unwrap();

    let result = MemoryEngine::load_checkpoint(temp_dir.path(), embedder());
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::Missing(_)))
    ));
}

#[test]
fn test_corrupt_checkpoint() {
    let temp_dir = tempdir().unwrap();
    populated_engine().save_checkpoint(temp_dir.path()).unwrap();

    let path = temp_dir.path().join("short.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5a;
    std::fs::write(&path, bytes).unwrap();

    let result = MemoryEngine::load_checkpoint(temp_dir.path(), embedder());
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::ChecksumMismatch(_)))
    ));
}

#[test]
fn test_swapped_tier_files_rejected() {
    let temp_dir = tempdir().unwrap();
    populated_engine().save_checkpoint(temp_dir.path()).unwrap();
    std::fs::copy(
        temp_dir.path().join("short.bin"),
        temp_dir.path().join("mid.bin"),
    )
    .unwrap();

    let result = MemoryEngine::load_checkpoint(temp_dir.path(), embedder());
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::Inconsistent(_)))
    ));
}

#[test]
fn test_loading_requires_matching_embedder() {
    let temp_dir = tempdir().unwrap();
    populated_engine().save_checkpoint(temp_dir.path()).unwrap();
    let result = MemoryEngine::load_checkpoint(temp_dir.path(), Box::new(HashingEmbedder::new(8)));
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}

#[test]
fn test_files_from_two_saves_rejected() {
    let older = tempdir().unwrap();
    let newer = tempdir().unwrap();
    let mut engine = populated_engine();
    engine.save_checkpoint(older.path()).unwrap();
    engine.step(day(6)).unwrap();
    engine.save_checkpoint(newer.path()).unwrap();

    // a save interrupted after the long tier was rewritten
    std::fs::copy(newer.path().join("long.bin"), older.path().join("long.bin")).unwrap();

    let result = MemoryEngine::load_checkpoint(older.path(), embedder());
    assert!(matches!(
        result,
        Err(EngineError::Checkpoint(CheckpointError::Inconsistent(_)))
    ));
    assert!(MemoryEngine::load_checkpoint(newer.path(), embedder()).is_ok());
}
