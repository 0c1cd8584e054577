use super::*;
use crate::engine::adapter::ScriptedAdapter;

fn temp_run_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "spritegate-engine-{name}-{}-{nanos}",
        std::process::id()
    ))
}

fn anchor_frame() -> RgbaFrame {
    let mut f = RgbaFrame::transparent(32, 32);
    for y in 8..30 {
        for x in 10..18 {
            f.set_pixel(x, y, [90, 60, 30, 255]);
        }
    }
    f
}

#[test]
fn transparent_anchor_fails_the_run() {
    let dir = temp_run_dir("transparent");
    let res = Engine::start(
        AuditConfig::default(),
        EngineOpts::new(&dir),
        "run",
        2,
        RgbaFrame::transparent(32, 32),
        ScriptedAdapter::new(),
    );
    assert!(matches!(
        res,
        Err(crate::foundation::error::SpriteGateError::AnchorFullyTransparent { .. })
    ));
    let store = RunStateStore::open(RunLayout::new(&dir)).unwrap();
    assert_eq!(store.state().status, RunStatus::Failed);
    assert!(store.state().failure.as_deref().unwrap().contains("anchor"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn prompt_hash_depends_on_attempt_and_strategy() {
    let dir = temp_run_dir("hash");
    let engine = Engine::start(
        AuditConfig::default(),
        EngineOpts::new(&dir),
        "run",
        1,
        anchor_frame(),
        ScriptedAdapter::new(),
    )
    .unwrap();
    let a = engine.prompt_hash(FrameIndex(0), 1, Strategy::Baseline);
    let b = engine.prompt_hash(FrameIndex(0), 2, Strategy::SeedReroll);
    assert_eq!(a, engine.prompt_hash(FrameIndex(0), 1, Strategy::Baseline));
    assert_ne!(a, b);
    assert_eq!(a.len(), 16);
    assert_eq!(engine.chroma_key(), Some([255, 0, 255]));

    let _ = std::fs::remove_dir_all(&dir);
}
