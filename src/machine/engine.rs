//! Reward engine
//!
//! Holds settings, per-account draw state and the access gate, and moves value
//! between player balances and the reserve through a [`TokenLedger`]. Every
//! public mutator either applies completely or returns an error having changed
//! nothing.

use crate::common::{
    traits::{RandomProvider, TokenLedger},
    types::{Address, CallContext},
};
use crate::config::{MachineConfig, RandomnessMode};
use crate::errors::{AccessError, DrawError, LedgerError, SpinResult};
use crate::events::{MachineEvent, Receipt};
use crate::ledger::InMemoryLedger;
use crate::machine::{
    access::AccessControl,
    randomness::RandomnessSource,
    types::{AccountState, Eligibility, Settings},
};
use crate::metrics::MachineMetrics;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SpinMachine<L: TokenLedger = InMemoryLedger> {
    /// Ledger account holding the reserve
    address: Address,
    access: AccessControl,
    settings: Settings,
    accounts: HashMap<Address, AccountState>,
    randomness: RandomnessSource,
    ledger: L,
    metrics: Arc<MachineMetrics>,
}

impl<L: TokenLedger> SpinMachine<L> {
    /// Create a machine owned by `owner` whose reserve lives at `address`
    pub fn new(
        owner: Address,
        address: Address,
        ledger: L,
        randomness: RandomnessSource,
        settings: Settings,
    ) -> SpinResult<Self> {
        if address.is_zero() {
            return Err(AccessError::InvalidAddress("reserve").into());
        }
        let access = AccessControl::new(owner)?;

        tracing::info!(
            %owner,
            reserve = %address,
            randomness = %randomness.kind(),
            prizes = settings.prizes.len(),
            "spin machine initialized"
        );

        Ok(Self {
            address,
            access,
            settings,
            accounts: HashMap::new(),
            randomness,
            ledger,
            metrics: Arc::new(MachineMetrics::new()),
        })
    }

    /// Create a machine from loaded configuration. An out-of-band provider is
    /// operated by `owner`.
    pub fn from_config(config: &MachineConfig, owner: Address, address: Address, ledger: L) -> SpinResult<Self> {
        let randomness = match config.randomness.mode {
            RandomnessMode::InBand => RandomnessSource::in_band(),
            RandomnessMode::OutOfBand => {
                RandomnessSource::out_of_band(owner, config.randomness.initial_value)
            }
        };
        let settings = Settings {
            prizes: config.prizes.clone(),
            free_spin_delay: config.free_spin_delay_secs,
            extra_spin_price: config.extra_spin_price,
        };

        Self::new(owner, address, ledger, randomness, settings)
    }

    // ========================================
    // Configuration
    // ========================================

    /// Replace the prize table. Owner only.
    pub fn set_prize_table(&mut self, ctx: &CallContext, prizes: Vec<u64>) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_owner(&ctx.caller)?;
            if prizes.is_empty() {
                tracing::warn!("prize table cleared; eligible draws will fail until it is set again");
            }

            machine.settings.prizes = prizes.clone();
            tracing::info!(?prizes, "prize table changed");
            Ok(Receipt::single(MachineEvent::PrizesChanged { prizes }))
        })
    }

    /// Replace the free draw cooldown, in seconds. Owner only.
    pub fn set_cooldown_period(&mut self, ctx: &CallContext, value: u64) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_owner(&ctx.caller)?;

            let old = std::mem::replace(&mut machine.settings.free_spin_delay, value);
            tracing::info!(new = value, old, "cooldown period changed");
            Ok(Receipt::single(MachineEvent::CooldownChanged { new: value, old }))
        })
    }

    /// Replace the price of one credit. Owner only.
    pub fn set_purchase_price(&mut self, ctx: &CallContext, value: u64) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_owner(&ctx.caller)?;

            let old = std::mem::replace(&mut machine.settings.extra_spin_price, value);
            tracing::info!(new = value, old, "purchase price changed");
            Ok(Receipt::single(MachineEvent::PriceChanged { new: value, old }))
        })
    }

    /// Add `count` credits to `account` without payment. Owner only.
    pub fn grant_credits(&mut self, ctx: &CallContext, account: Address, count: u64) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_owner(&ctx.caller)?;

            machine.add_credits(account, count)?;
            machine.metrics.record_credits(count);
            tracing::info!(granter = %ctx.caller, recipient = %account, count, "credits granted");
            Ok(Receipt::single(MachineEvent::CreditsGranted {
                granter: ctx.caller,
                recipient: account,
                count,
            }))
        })
    }

    /// Install a different randomness provider. Owner only.
    pub fn set_random_provider(&mut self, ctx: &CallContext, source: RandomnessSource) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_owner(&ctx.caller)?;

            let kind = source.kind();
            machine.randomness = source;
            tracing::info!(%kind, "randomness provider changed");
            Ok(Receipt::single(MachineEvent::RandomProviderChanged { kind }))
        })
    }

    /// Feed the out-of-band provider. Operator only.
    pub fn update_random_value(&mut self, ctx: &CallContext, value: u64) -> SpinResult<Receipt> {
        self.track(|machine| machine.randomness.set_value(&ctx.caller, value))
    }

    // ========================================
    // Access gate
    // ========================================

    pub fn set_owner(&mut self, ctx: &CallContext, new_owner: Address) -> SpinResult<Receipt> {
        self.track(|machine| machine.access.set_owner(&ctx.caller, new_owner))
    }

    pub fn set_blacklister(&mut self, ctx: &CallContext, new_blacklister: Address) -> SpinResult<Receipt> {
        self.track(|machine| machine.access.set_blacklister(&ctx.caller, new_blacklister))
    }

    pub fn add_to_blacklist(&mut self, ctx: &CallContext, account: Address) -> SpinResult<Receipt> {
        self.track(|machine| machine.access.add_to_blacklist(&ctx.caller, account))
    }

    pub fn remove_from_blacklist(&mut self, ctx: &CallContext, account: Address) -> SpinResult<Receipt> {
        self.track(|machine| machine.access.remove_from_blacklist(&ctx.caller, account))
    }

    pub fn self_blacklist(&mut self, ctx: &CallContext) -> Receipt {
        self.access.self_blacklist(&ctx.caller)
    }

    // ========================================
    // Purchase and draw
    // ========================================

    /// Buy `count` credits for `recipient`, paid by the caller into the reserve.
    ///
    /// Only the caller's blacklist status is checked; gifting to a listed
    /// recipient is allowed.
    pub fn purchase_credits(&mut self, ctx: &CallContext, recipient: Address, count: u64) -> SpinResult<Receipt> {
        self.track(|machine| {
            machine.access.require_not_blacklisted(&ctx.caller)?;

            let cost = count
                .checked_mul(machine.settings.extra_spin_price)
                .ok_or_else(|| LedgerError::InsufficientFunds {
                    account: ctx.caller,
                    available: machine.ledger.balance_of(&ctx.caller),
                    required: u64::MAX,
                })?;
            let credits = machine
                .account(&recipient)
                .extra_spins
                .checked_add(count)
                .ok_or(DrawError::CreditOverflow(recipient))?;

            machine.ledger.transfer(&ctx.caller, &machine.address, cost)?;
            machine.accounts.entry(recipient).or_default().extra_spins = credits;
            machine.metrics.record_credits(count);

            tracing::info!(buyer = %ctx.caller, %recipient, count, cost, "credits purchased");
            Ok(Receipt::single(MachineEvent::CreditsPurchased {
                buyer: ctx.caller,
                recipient,
                count,
            }))
        })
    }

    /// Draw a prize for the caller.
    ///
    /// A blacklisted caller is rejected. A caller with neither a free draw nor
    /// a credit gets an empty receipt and nothing changes. Otherwise the prize
    /// is paid up to the reserve balance and the free draw or one credit is
    /// consumed, even when the reserve pays nothing.
    pub fn draw(&mut self, ctx: &CallContext) -> SpinResult<Receipt> {
        self.track(|machine| {
            let account = ctx.caller;
            machine.access.require_not_blacklisted(&account)?;

            let state = machine.account(&account);
            let eligibility = state.eligibility(ctx.timestamp, machine.settings.free_spin_delay);
            if eligibility == Eligibility::Ineligible {
                machine.metrics.record_noop();
                tracing::debug!(%account, "draw skipped: nothing to play with");
                return Ok(Receipt::empty());
            }

            let prizes = &machine.settings.prizes;
            if prizes.is_empty() {
                return Err(DrawError::NoPrizesConfigured.into());
            }
            let index = (machine.randomness.draw(ctx) % prizes.len() as u64) as usize;
            let nominal = prizes[index];

            let reserve = machine.ledger.balance_of(&machine.address);
            let sent = nominal.min(reserve);
            machine.ledger.transfer(&machine.address, &account, sent)?;

            let used_credit = eligibility == Eligibility::Credit;
            let entry = machine.accounts.entry(account).or_default();
            if used_credit {
                entry.extra_spins -= 1;
            } else {
                entry.last_free_spin = ctx.timestamp;
            }
            machine.metrics.record_draw(nominal, sent, used_credit);

            if sent < nominal {
                tracing::warn!(%account, nominal, sent, "reserve short; partial payout");
            } else {
                tracing::info!(%account, nominal, used_credit, "draw settled");
            }
            Ok(Receipt::single(MachineEvent::Drawn {
                account,
                nominal,
                sent,
                used_credit,
            }))
        })
    }

    // ========================================
    // Queries
    // ========================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prizes(&self) -> &[u64] {
        &self.settings.prizes
    }

    pub fn cooldown_period(&self) -> u64 {
        self.settings.free_spin_delay
    }

    pub fn purchase_price(&self) -> u64 {
        self.settings.extra_spin_price
    }

    /// Draw state of `account`; default for accounts never seen
    pub fn account(&self, account: &Address) -> AccountState {
        self.accounts.get(account).copied().unwrap_or_default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn credits(&self, account: &Address) -> u64 {
        self.account(account).extra_spins
    }

    pub fn last_free_draw(&self, account: &Address) -> u64 {
        self.account(account).last_free_spin
    }

    pub fn eligibility(&self, account: &Address, now: u64) -> Eligibility {
        self.account(account)
            .eligibility(now, self.settings.free_spin_delay)
    }

    pub fn can_free_spin(&self, account: &Address, now: u64) -> bool {
        self.account(account)
            .can_free_spin(now, self.settings.free_spin_delay)
    }

    /// Free or credit eligible; blacklist status is not considered
    pub fn can_spin(&self, account: &Address, now: u64) -> bool {
        self.eligibility(account, now).is_eligible()
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.access.is_blacklisted(account)
    }

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn blacklister(&self) -> Address {
        self.access.blacklister()
    }

    pub fn reserve_balance(&self) -> u64 {
        self.ledger.balance_of(&self.address)
    }

    pub fn random_provider(&self) -> &RandomnessSource {
        &self.randomness
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for external funding
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn metrics(&self) -> Arc<MachineMetrics> {
        Arc::clone(&self.metrics)
    }

    fn add_credits(&mut self, account: Address, count: u64) -> SpinResult<()> {
        let credits = self
            .account(&account)
            .extra_spins
            .checked_add(count)
            .ok_or(DrawError::CreditOverflow(account))?;
        self.accounts.entry(account).or_default().extra_spins = credits;
        Ok(())
    }

    fn track<T>(&mut self, op: impl FnOnce(&mut Self) -> SpinResult<T>) -> SpinResult<T> {
        let result = op(self);
        if result.is_err() {
            self.metrics.record_rejection();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{RandomnessError, SpinError};
    use crate::machine::randomness::RandomnessKind;

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn player() -> Address {
        Address::from_label("player")
    }

    fn ctx(caller: Address, timestamp: u64) -> CallContext {
        CallContext::new(caller, timestamp, timestamp)
    }

    fn machine() -> SpinMachine {
        SpinMachine::new(
            owner(),
            Address::from_label("machine"),
            InMemoryLedger::new(),
            RandomnessSource::out_of_band(owner(), 0),
            Settings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let machine = machine();
        assert!(machine.prizes().is_empty());
        assert_eq!(machine.cooldown_period(), 86_400);
        assert_eq!(machine.purchase_price(), 0);
        assert_eq!(machine.owner(), owner());
        assert_eq!(machine.blacklister(), owner());
        assert_eq!(machine.reserve_balance(), 0);
    }

    #[test]
    fn test_zero_reserve_address_rejected() {
        let result = SpinMachine::new(
            owner(),
            Address::ZERO,
            InMemoryLedger::new(),
            RandomnessSource::in_band(),
            Settings::default(),
        );
        assert!(matches!(
            result,
            Err(SpinError::Access(AccessError::InvalidAddress("reserve")))
        ));
    }

    #[test]
    fn test_set_prize_table() {
        let mut machine = machine();

        assert!(machine
            .set_prize_table(&ctx(player(), 1), vec![10, 20, 30])
            .unwrap_err()
            .is_unauthorized());
        assert!(machine.prizes().is_empty());

        let receipt = machine.set_prize_table(&ctx(owner(), 1), vec![10, 20, 30]).unwrap();
        assert_eq!(machine.prizes(), &[10, 20, 30]);
        assert_eq!(
            receipt.events,
            vec![MachineEvent::PrizesChanged {
                prizes: vec![10, 20, 30]
            }]
        );
    }

    #[test]
    fn test_set_cooldown_period_reports_old_value() {
        let mut machine = machine();

        assert!(machine.set_cooldown_period(&ctx(player(), 1), 10).is_err());
        let receipt = machine.set_cooldown_period(&ctx(owner(), 1), 10).unwrap();

        assert_eq!(machine.cooldown_period(), 10);
        assert_eq!(
            receipt.events,
            vec![MachineEvent::CooldownChanged { new: 10, old: 86_400 }]
        );
    }

    #[test]
    fn test_set_purchase_price_reports_old_value() {
        let mut machine = machine();

        assert!(machine.set_purchase_price(&ctx(player(), 1), 10).is_err());
        machine.set_purchase_price(&ctx(owner(), 1), 10).unwrap();
        let receipt = machine.set_purchase_price(&ctx(owner(), 1), 100).unwrap();

        assert_eq!(machine.purchase_price(), 100);
        assert_eq!(
            receipt.events,
            vec![MachineEvent::PriceChanged { new: 100, old: 10 }]
        );
    }

    #[test]
    fn test_grant_credits() {
        let mut machine = machine();

        assert!(machine.grant_credits(&ctx(player(), 1), player(), 10).is_err());
        assert_eq!(machine.credits(&player()), 0);

        let receipt = machine.grant_credits(&ctx(owner(), 1), player(), 10).unwrap();
        assert_eq!(machine.credits(&player()), 10);
        assert_eq!(
            receipt.events,
            vec![MachineEvent::CreditsGranted {
                granter: owner(),
                recipient: player(),
                count: 10,
            }]
        );
    }

    #[test]
    fn test_grant_overflow_changes_nothing() {
        let mut machine = machine();
        machine.grant_credits(&ctx(owner(), 1), player(), u64::MAX).unwrap();

        let err = machine.grant_credits(&ctx(owner(), 1), player(), 1).unwrap_err();

        assert!(matches!(err, SpinError::Draw(DrawError::CreditOverflow(_))));
        assert_eq!(machine.credits(&player()), u64::MAX);
    }

    #[test]
    fn test_empty_prize_table_fails_eligible_draw() {
        let mut machine = machine();

        let err = machine.draw(&ctx(player(), 1_000)).unwrap_err();

        assert!(matches!(err, SpinError::Draw(DrawError::NoPrizesConfigured)));
        assert_eq!(machine.last_free_draw(&player()), 0);
        assert_eq!(machine.account_count(), 0);
    }

    #[test]
    fn test_index_taken_modulo_table_length() {
        let mut machine = machine();
        machine.set_prize_table(&ctx(owner(), 1), vec![10, 20, 30]).unwrap();
        machine.ledger_mut().deposit(&Address::from_label("machine"), 1_000).unwrap();
        machine.set_cooldown_period(&ctx(owner(), 1), 0).unwrap();

        machine.update_random_value(&ctx(owner(), 1), 4).unwrap();
        let drawn = machine.draw(&ctx(player(), 10)).unwrap().drawn().unwrap();
        assert_eq!(drawn.nominal, 20);

        machine.update_random_value(&ctx(owner(), 1), 2).unwrap();
        let drawn = machine.draw(&ctx(player(), 11)).unwrap().drawn().unwrap();
        assert_eq!(drawn.nominal, 30);
    }

    #[test]
    fn test_set_random_provider() {
        let mut machine = machine();

        assert!(machine
            .set_random_provider(&ctx(player(), 1), RandomnessSource::in_band())
            .is_err());
        let receipt = machine
            .set_random_provider(&ctx(owner(), 1), RandomnessSource::in_band())
            .unwrap();

        assert_eq!(machine.random_provider().kind(), RandomnessKind::InBand);
        assert_eq!(
            receipt.events,
            vec![MachineEvent::RandomProviderChanged {
                kind: RandomnessKind::InBand
            }]
        );

        let err = machine.update_random_value(&ctx(owner(), 1), 5).unwrap_err();
        assert!(matches!(
            err,
            SpinError::Randomness(RandomnessError::NotOperatorFed)
        ));
    }

    #[test]
    fn test_rejections_are_counted() {
        let mut machine = machine();
        let metrics = machine.metrics();

        let _ = machine.set_prize_table(&ctx(player(), 1), vec![1]);
        let _ = machine.draw(&ctx(player(), 1));

        assert_eq!(metrics.snapshot().rejected_operations, 2);
    }

    #[test]
    fn test_from_config_out_of_band_operated_by_owner() {
        let mut config = MachineConfig::default();
        config.prizes = vec![5];
        config.randomness.mode = RandomnessMode::OutOfBand;
        config.randomness.initial_value = 3;

        let mut machine = SpinMachine::from_config(
            &config,
            owner(),
            Address::from_label("machine"),
            InMemoryLedger::new(),
        )
        .unwrap();

        assert_eq!(machine.random_provider().kind(), RandomnessKind::OutOfBand);
        assert_eq!(machine.prizes(), &[5]);
        assert!(machine.update_random_value(&ctx(owner(), 1), 9).is_ok());
        assert!(machine.update_random_value(&ctx(player(), 1), 9).is_err());
    }
}
