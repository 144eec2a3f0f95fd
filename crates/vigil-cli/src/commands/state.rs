use vigil_core::ProbeConfig;
use vigil_state::StateStore;

pub fn show(config: &ProbeConfig) -> anyhow::Result<u8> {
    let store = StateStore::new(&config.state_path);
    match store.read()? {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("no state recorded at {}", store.path().display()),
    }
    Ok(0)
}

pub fn reset(config: &ProbeConfig) -> anyhow::Result<u8> {
    let store = StateStore::new(&config.state_path);
    if store.clear()? {
        println!("✓ Removed {}", store.path().display());
    } else {
        println!("no state recorded at {}", store.path().display());
    }
    Ok(0)
}
