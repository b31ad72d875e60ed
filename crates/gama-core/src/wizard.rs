//! send flow state
//!
//! one `WizardState` per send flow: created on entry, mutated by the
//! steps, frozen into a queued transaction on confirm, then discarded.
//! everything here is synchronous and side-effect free; balances and
//! record counts are cached copies pushed in by the caller.

use crate::amount::{Amount, AmountField};
use crate::types::{PrivacyMode, Token};

/// which fee pools the user may pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOptions {
    pub private_enabled: bool,
    pub public_enabled: bool,
}

impl Default for FeeOptions {
    fn default() -> Self {
        Self {
            private_enabled: true,
            public_enabled: true,
        }
    }
}

/// outcome of entering the amount step
///
/// `Unavailable` is a routing decision, not an error: with no public
/// balance and fewer than two spendable records there is nothing any
/// input could fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEntry {
    Ready,
    Unavailable { spendable_records: u32 },
}

/// mutable state of the send wizard
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    pub token: Option<Token>,
    pub recipient: String,
    pub amount: AmountField,
    pub memo: String,
    pub send_type: PrivacyMode,
    pub received_type: PrivacyMode,
    pub fee: AmountField,
    pub fee_type: PrivacyMode,
    /// offload proof generation to a delegated prover
    pub delegate: bool,
    private_balance: Amount,
    public_balance: Amount,
    spendable_records: u32,
    fee_options: FeeOptions,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.recipient = recipient.into();
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        self.memo = memo.into();
    }

    pub fn set_send_type(&mut self, mode: PrivacyMode) {
        self.send_type = mode;
    }

    pub fn set_received_type(&mut self, mode: PrivacyMode) {
        self.received_type = mode;
    }

    pub fn set_fee_type(&mut self, mode: PrivacyMode) {
        self.fee_type = mode;
    }

    pub fn set_delegate(&mut self, delegate: bool) {
        self.delegate = delegate;
    }

    /// push fresh balance caches into the flow
    pub fn set_balances(&mut self, private: Amount, public: Amount, spendable_records: u32) {
        self.private_balance = private;
        self.public_balance = public;
        self.spendable_records = spendable_records;
    }

    /// balance of the pool the transfer spends from
    pub fn available_balance(&self) -> Amount {
        self.pool_balance(self.send_type)
    }

    pub fn pool_balance(&self, mode: PrivacyMode) -> Amount {
        match mode {
            PrivacyMode::Private => self.private_balance,
            PrivacyMode::Public => self.public_balance,
        }
    }

    pub fn spendable_records(&self) -> u32 {
        self.spendable_records
    }

    pub fn fee_options(&self) -> FeeOptions {
        self.fee_options
    }

    /// token precision, zero until a token is chosen
    pub fn precision(&self) -> u8 {
        self.token.as_ref().map(|t| t.decimals).unwrap_or(0)
    }

    /// apply raw amount input, capped by the spendable pool balance
    ///
    /// returns whether the input took; rejected input leaves the field
    /// exactly as it was.
    pub fn set_amount(&mut self, raw: &str) -> bool {
        let precision = self.precision();
        let cap = Some(self.available_balance());
        self.amount.set(raw, precision, cap)
    }

    /// apply raw fee input
    ///
    /// fee fields carry no cap; an unaffordable fee fails at submission.
    pub fn set_fee(&mut self, raw: &str) -> bool {
        let precision = self.precision();
        self.fee.set(raw, precision, None)
    }

    /// pick default privacy modes on entering the amount step
    ///
    /// with public funds the transfer defaults to the public pool, and a
    /// lone private record restricts which pool may pay the fee. with no
    /// public funds a private spend needs at least two spendable records,
    /// one for the transfer and one to fund the fee.
    pub fn apply_entry_policy(&mut self) -> FlowEntry {
        self.fee_options = FeeOptions::default();

        if self.public_balance > Amount::ZERO {
            self.send_type = PrivacyMode::Public;
            self.received_type = PrivacyMode::Public;
            self.fee_type = PrivacyMode::Public;
            if self.spendable_records == 1 {
                if self.public_balance >= self.private_balance {
                    self.fee_options.private_enabled = false;
                } else {
                    self.fee_options.public_enabled = false;
                }
            }
        } else {
            if self.spendable_records <= 1 {
                return FlowEntry::Unavailable {
                    spendable_records: self.spendable_records,
                };
            }
            self.send_type = PrivacyMode::Private;
            self.received_type = PrivacyMode::Private;
            self.fee_type = PrivacyMode::Private;
        }

        // keep the fee selection on an enabled pool
        if self.fee_type.is_private() && !self.fee_options.private_enabled {
            self.fee_type = PrivacyMode::Public;
        } else if !self.fee_type.is_private() && !self.fee_options.public_enabled {
            self.fee_type = PrivacyMode::Private;
        }

        FlowEntry::Ready
    }

    pub fn amount_step_complete(&self) -> bool {
        self.token.is_some() && !self.amount.amount().is_zero()
    }

    pub fn recipient_step_complete(&self) -> bool {
        !self.recipient.trim().is_empty()
    }

    pub fn ready_to_confirm(&self) -> bool {
        self.amount_step_complete() && self.recipient_step_complete()
    }

    /// reset the form for the next flow
    pub fn clear(&mut self) {
        *self = Self {
            private_balance: self.private_balance,
            public_balance: self.public_balance,
            spendable_records: self.spendable_records,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Token {
        Token::new("credits.gama", "GAMA", 6)
    }

    fn state(private: u128, public: u128, records: u32) -> WizardState {
        let mut s = WizardState::new();
        s.set_token(token());
        s.set_balances(Amount(private), Amount(public), records);
        s
    }

    #[test]
    fn test_public_balance_defaults_to_public_modes() {
        let mut s = state(50, 100, 1);
        assert_eq!(s.apply_entry_policy(), FlowEntry::Ready);
        assert_eq!(s.send_type, PrivacyMode::Public);
        assert_eq!(s.received_type, PrivacyMode::Public);
        // one record and public >= private: the private fee option closes
        assert!(!s.fee_options().private_enabled);
        assert!(s.fee_options().public_enabled);
        assert_eq!(s.fee_type, PrivacyMode::Public);
    }

    #[test]
    fn test_single_record_bigger_private_pool_closes_public_fee() {
        let mut s = state(200, 100, 1);
        assert_eq!(s.apply_entry_policy(), FlowEntry::Ready);
        assert_eq!(s.send_type, PrivacyMode::Public);
        assert!(s.fee_options().private_enabled);
        assert!(!s.fee_options().public_enabled);
        // the default selection moves off the closed pool
        assert_eq!(s.fee_type, PrivacyMode::Private);
    }

    #[test]
    fn test_no_public_one_record_is_unavailable() {
        let mut s = state(30, 0, 1);
        assert_eq!(
            s.apply_entry_policy(),
            FlowEntry::Unavailable {
                spendable_records: 1
            }
        );
    }

    #[test]
    fn test_no_public_no_records_is_unavailable() {
        let mut s = state(0, 0, 0);
        assert!(matches!(
            s.apply_entry_policy(),
            FlowEntry::Unavailable { .. }
        ));
    }

    #[test]
    fn test_no_public_two_records_goes_private() {
        let mut s = state(30, 0, 2);
        assert_eq!(s.apply_entry_policy(), FlowEntry::Ready);
        assert_eq!(s.send_type, PrivacyMode::Private);
        assert_eq!(s.fee_type, PrivacyMode::Private);
        assert!(s.fee_options().private_enabled);
        assert!(s.fee_options().public_enabled);
    }

    #[test]
    fn test_many_records_leaves_fee_options_open() {
        let mut s = state(500, 100, 3);
        assert_eq!(s.apply_entry_policy(), FlowEntry::Ready);
        assert!(s.fee_options().private_enabled);
        assert!(s.fee_options().public_enabled);
    }

    #[test]
    fn test_available_balance_follows_send_type() {
        let mut s = state(30, 70, 2);
        s.set_send_type(PrivacyMode::Private);
        assert_eq!(s.available_balance(), Amount(30));
        s.set_send_type(PrivacyMode::Public);
        assert_eq!(s.available_balance(), Amount(70));
    }

    #[test]
    fn test_amount_capped_by_pool() {
        let mut s = state(0, 5_000_000, 2);
        s.set_send_type(PrivacyMode::Public);
        assert!(s.set_amount("5"));
        assert_eq!(s.amount.amount(), Amount(5_000_000));
        // over the public pool: rejected, field untouched
        assert!(!s.set_amount("5.000001"));
        assert_eq!(s.amount.amount(), Amount(5_000_000));
        assert_eq!(s.amount.text(), "5");
    }

    #[test]
    fn test_fee_not_capped_by_pool() {
        let mut s = state(0, 5_000_000, 2);
        s.set_send_type(PrivacyMode::Public);
        s.set_fee_type(PrivacyMode::Public);
        // fee input is not bounded by the cached pool balance
        assert!(s.set_fee("9"));
        assert_eq!(s.fee.amount(), Amount(9_000_000));
        // garbage still rejects and keeps prior state
        assert!(!s.set_fee(&"9".repeat(40)));
        assert_eq!(s.fee.amount(), Amount(9_000_000));
    }

    #[test]
    fn test_setters_idempotent() {
        let mut s = state(10, 20, 2);
        s.set_recipient("aleo1abc");
        s.set_recipient("aleo1abc");
        s.set_send_type(PrivacyMode::Public);
        s.set_send_type(PrivacyMode::Public);
        assert_eq!(s.recipient, "aleo1abc");
        assert_eq!(s.send_type, PrivacyMode::Public);
    }

    #[test]
    fn test_steps_gate_on_inputs() {
        let mut s = state(0, 10_000_000, 2);
        s.set_send_type(PrivacyMode::Public);
        assert!(!s.amount_step_complete());
        s.set_amount("1");
        assert!(s.amount_step_complete());
        assert!(!s.ready_to_confirm());
        s.set_recipient("aleo1recipient");
        assert!(s.ready_to_confirm());
    }

    #[test]
    fn test_clear_keeps_balance_caches() {
        let mut s = state(10, 10_000_000, 2);
        s.set_send_type(PrivacyMode::Public);
        s.set_amount("1");
        s.set_recipient("aleo1x");
        s.clear();
        assert!(s.recipient.is_empty());
        assert!(s.amount.is_empty());
        assert!(s.token.is_none());
        assert_eq!(s.pool_balance(PrivacyMode::Public), Amount(10_000_000));
    }
}
