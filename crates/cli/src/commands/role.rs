use passport_kernel::Address;

use crate::engine::PassportEngine;

pub async fn run(engine: &PassportEngine, address: &Address) -> anyhow::Result<()> {
    match engine.sync().snapshots().role(address).await? {
        Some(role) => println!("{} => {}", address, role),
        None => println!("{} has no registered role", address),
    }
    Ok(())
}
