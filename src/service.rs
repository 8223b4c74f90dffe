//! Serialized execution service
//!
//! The machine is moved into a single tokio task that drains a command queue,
//! so every operation runs to completion with exclusive access before the next
//! one starts. Handles are cheap to clone and may be used from any task.

use crate::common::{
    traits::TokenLedger,
    types::{Address, CallContext},
};
use crate::errors::{ServiceError, SpinError, SpinResult};
use crate::events::Receipt;
use crate::machine::{engine::SpinMachine, types::AccountState};
use crate::metrics::{MachineMetrics, MetricsSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job<L> = Box<dyn FnOnce(&mut SpinMachine<L>) + Send>;

enum Command<L: TokenLedger> {
    Run(Job<L>),
    Stop,
}

/// Owner of the running machine task
pub struct MachineService<L: TokenLedger + 'static> {
    handle: MachineHandle<L>,
    task: JoinHandle<SpinMachine<L>>,
}

impl<L: TokenLedger + 'static> MachineService<L> {
    /// Move `machine` into a new task with a queue of `buffer` commands
    pub fn spawn(machine: SpinMachine<L>, buffer: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Command<L>>(buffer.max(1));
        let metrics = machine.metrics();

        let task = tokio::spawn(async move {
            let mut machine = machine;
            while let Some(command) = receiver.recv().await {
                match command {
                    Command::Run(job) => job(&mut machine),
                    Command::Stop => break,
                }
            }
            tracing::info!("machine service stopped");
            machine
        });

        Self {
            handle: MachineHandle { sender, metrics },
            task,
        }
    }

    pub fn handle(&self) -> MachineHandle<L> {
        self.handle.clone()
    }

    /// Stop after the commands already queued and hand the machine back
    pub async fn shutdown(self) -> SpinResult<SpinMachine<L>> {
        self.handle
            .sender
            .send(Command::Stop)
            .await
            .map_err(|_| ServiceError::Unavailable)?;

        self.task.await.map_err(|e| {
            tracing::warn!("machine task ended abnormally: {}", e);
            SpinError::from(ServiceError::Unavailable)
        })
    }
}

pub struct MachineHandle<L: TokenLedger + 'static> {
    sender: mpsc::Sender<Command<L>>,
    metrics: Arc<MachineMetrics>,
}

impl<L: TokenLedger + 'static> Clone for MachineHandle<L> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<L: TokenLedger + 'static> MachineHandle<L> {
    /// Run `op` with exclusive access to the machine
    pub async fn execute<R, F>(&self, op: F) -> SpinResult<R>
    where
        F: FnOnce(&mut SpinMachine<L>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job<L> = Box::new(move |machine| {
            let _ = reply.send(op(machine));
        });

        self.sender
            .send(Command::Run(job))
            .await
            .map_err(|_| ServiceError::Unavailable)?;
        response
            .await
            .map_err(|_| SpinError::from(ServiceError::Unavailable))
    }

    pub async fn draw(&self, ctx: CallContext) -> SpinResult<Receipt> {
        self.execute(move |machine| machine.draw(&ctx)).await?
    }

    pub async fn purchase_credits(&self, ctx: CallContext, recipient: Address, count: u64) -> SpinResult<Receipt> {
        self.execute(move |machine| machine.purchase_credits(&ctx, recipient, count))
            .await?
    }

    pub async fn grant_credits(&self, ctx: CallContext, recipient: Address, count: u64) -> SpinResult<Receipt> {
        self.execute(move |machine| machine.grant_credits(&ctx, recipient, count))
            .await?
    }

    pub async fn account(&self, account: Address) -> SpinResult<AccountState> {
        self.execute(move |machine| machine.account(&account)).await
    }

    pub async fn reserve_balance(&self) -> SpinResult<u64> {
        self.execute(|machine| machine.reserve_balance()).await
    }

    /// Read without queueing behind pending commands
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::machine::{randomness::RandomnessSource, types::Settings};

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn reserve() -> Address {
        Address::from_label("machine")
    }

    fn funded_machine(reserve_funds: u64) -> SpinMachine {
        let mut ledger = InMemoryLedger::new();
        ledger.deposit(&reserve(), reserve_funds).unwrap();
        SpinMachine::new(
            owner(),
            reserve(),
            ledger,
            RandomnessSource::out_of_band(owner(), 0),
            Settings {
                prizes: vec![10],
                free_spin_delay: 1_000,
                extra_spin_price: 0,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_draw_through_service() {
        let service = MachineService::spawn(funded_machine(100), 16);
        let handle = service.handle();
        let player = Address::from_label("player");

        let receipt = handle.draw(CallContext::new(player, 1, 5_000)).await.unwrap();
        assert_eq!(receipt.drawn().unwrap().sent, 10);

        let second = handle.draw(CallContext::new(player, 2, 5_001)).await.unwrap();
        assert!(second.is_noop());

        assert_eq!(handle.reserve_balance().await.unwrap(), 90);
        assert_eq!(handle.account(player).await.unwrap().last_free_spin, 5_000);

        let machine = service.shutdown().await.unwrap();
        assert_eq!(machine.ledger().balance_of(&player), 10);
    }

    #[tokio::test]
    async fn test_concurrent_draws_never_overdraw() {
        // 50 players race for a reserve that covers only 25 full prizes
        let service = MachineService::spawn(funded_machine(250), 8);
        let mut tasks = Vec::new();

        for i in 0..50 {
            let handle = service.handle();
            tasks.push(tokio::spawn(async move {
                let player = Address::from_label(&format!("player-{}", i));
                handle.draw(CallContext::new(player, 1, 5_000)).await
            }));
        }

        let mut paid = 0;
        for task in tasks {
            let receipt = task.await.unwrap().unwrap();
            paid += receipt.drawn().unwrap().sent;
        }

        let handle = service.handle();
        assert_eq!(paid, 250);
        assert_eq!(handle.reserve_balance().await.unwrap(), 0);

        let metrics = handle.metrics();
        assert_eq!(metrics.draws_settled, 50);
        assert_eq!(metrics.total_paid, 250);
        assert_eq!(metrics.total_shortfall(), 250);
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_unavailable() {
        let service = MachineService::spawn(funded_machine(0), 4);
        let handle = service.handle();

        service.shutdown().await.unwrap();

        let err = handle.reserve_balance().await.unwrap_err();
        assert!(matches!(err, SpinError::Service(ServiceError::Unavailable)));
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let service = MachineService::spawn(funded_machine(0), 4);
        let handle = service.handle();
        let stranger = Address::from_label("stranger");

        let err = handle
            .grant_credits(CallContext::new(stranger, 1, 1), stranger, 1)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(handle.account(stranger).await.unwrap().extra_spins, 0);
    }
}
