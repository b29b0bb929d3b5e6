#![cfg_attr(not(feature = "std"), no_std, no_main)]

pub use self::bnext::{Approval, BNext, BNextRef, Error, FeeMode, Upgraded};

/// # BNext: Primary Ledger
///
/// **Role:** ground-truth balance table for BNXT, transfer fee engine,
/// permit-based delegated burn, and role-gated administration.
///
/// ## Fee Engine
///
/// Fees apply to `transfer`, `transfer_from` and every leg of
/// `batch_transfer`. Mint (construction only) and burns are fee-free.
///
/// ```text
/// sender exempt OR FeeMode::None   fee = 0
/// FeeMode::Percentage(bps)         fee = floor(amount × bps / 10 000)
/// FeeMode::Fixed(f)                fee = f            (f > amount → InsufficientAmount)
///
/// sender   −= amount
/// to       += amount − fee
/// treasury += fee                  (fee > 0 with no/zero treasury → TreasuryNotConfigured)
/// ```
///
/// Every multi-write message validates all legs before the first storage
/// write, so a failure leaves balances untouched even before the runtime
/// reverts the call.
///
/// ## Permits
///
/// A permit is an ECDSA (secp256k1) signature over
/// `keccak256(SCALE(PERMIT_DOMAIN, name, contract, owner, spender, value, nonce, deadline))`.
/// The signer's account is `blake2_256(compressed_public_key)`. Each accepted
/// permit bumps the owner's nonce, so a signature can only be used once.
#[ink::contract]
pub mod bnext {
    use access_control::{AccessControl, Role, RoleGranted, RoleRevoked};
    use ink::env::hash::{Blake2x256, Keccak256};
    use ink::prelude::string::String;
    use ink::prelude::vec::Vec;
    use ink::storage::Mapping;

    // =========================================================================
    // CONSTANTS
    // =========================================================================

    /// Fixed-point precision of every balance.
    pub const DECIMALS: u8 = 18;

    /// Basis-point denominator: 10 000 bps = 100%.
    pub const BPS_DENOMINATOR: Balance = 10_000;

    /// Layout version written at construction. Bump only together with an
    /// explicit migration message.
    pub const STORAGE_VERSION: u16 = 1;

    /// Domain tag mixed into every permit digest.
    pub const PERMIT_DOMAIN: &[u8] = b"BNext::permit::v1";

    /// The all-zero account doubles as the burn sink and never counts as a
    /// fee treasury.
    pub const ZERO_ACCOUNT: [u8; 32] = [0u8; 32];

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct BNext {
        // ── Token metadata ─────────────────────────────────────────────────
        name: String,
        symbol: String,
        decimals: u8,

        // ── Ledger ─────────────────────────────────────────────────────────
        total_supply: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,
        /// Next expected permit nonce per owner.
        nonces: Mapping<AccountId, u64>,

        // ── Access control ─────────────────────────────────────────────────
        roles: AccessControl,

        // ── Fee engine ─────────────────────────────────────────────────────
        fee_mode: FeeMode,
        fee_treasury: Option<AccountId>,
        excluded_from_fees: Mapping<AccountId, ()>,

        storage_version: u16,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// `value` is what `to` received; `fee` went to the treasury.
    /// Mint has `from: None`, burn has `to: None`.
    #[ink(event)]
    pub struct Transfer {
        #[ink(topic)]
        from: Option<AccountId>,
        #[ink(topic)]
        to: Option<AccountId>,
        value: Balance,
        fee: Balance,
    }

    /// Also emitted by the bonus ledger, which shares this definition.
    #[ink(event)]
    pub struct Approval {
        #[ink(topic)]
        pub owner: AccountId,
        #[ink(topic)]
        pub spender: AccountId,
        pub value: Balance,
    }

    #[ink(event)]
    pub struct Burn {
        #[ink(topic)]
        from: AccountId,
        amount: Balance,
        new_total_supply: Balance,
    }

    #[ink(event)]
    pub struct FeeModeChanged {
        mode: FeeMode,
        #[ink(topic)]
        sender: AccountId,
    }

    #[ink(event)]
    pub struct FeeTreasuryChanged {
        previous: Option<AccountId>,
        #[ink(topic)]
        treasury: AccountId,
    }

    #[ink(event)]
    pub struct ExclusionChanged {
        #[ink(topic)]
        account: AccountId,
        excluded: bool,
    }

    /// Also emitted by the bonus ledger, which shares this definition.
    #[ink(event)]
    pub struct Upgraded {
        pub code_hash: Hash,
    }

    // =========================================================================
    // TYPES
    // =========================================================================

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub enum FeeMode {
        /// No transfer fee.
        #[default]
        None,
        /// Fee as a fraction of the amount, in basis points (0 – 10 000).
        Percentage(u16),
        /// Flat fee per transfer leg.
        Fixed(Balance),
    }

    /// One credit computed ahead of settlement.
    struct TransferLeg {
        to: AccountId,
        net: Balance,
        fee: Balance,
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        /// Caller lacks the role the message requires.
        Unauthorized,
        /// Debited account holds less than the amount.
        InsufficientBalance,
        /// Spender's allowance is below the amount.
        InsufficientAllowance,
        /// Fixed fee exceeds the amount being transferred.
        InsufficientAmount,
        /// `batch_transfer` got recipient and amount lists of different length.
        LengthMismatch,
        /// A non-zero fee is due but no treasury has been set.
        TreasuryNotConfigured,
        /// Percentage fee above 10 000 bps.
        InvalidFeeMode,
        /// Permit signature does not recover to the owner for the current nonce.
        InvalidSignature,
        /// Permit deadline is in the past.
        SignatureExpired,
        /// An arithmetic operation overflowed.
        Overflow,
        /// `set_code_hash` was rejected by the runtime.
        UpgradeFailed,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl BNext {
        // ---------------------------------------------------------------------
        // Constructor
        // ---------------------------------------------------------------------

        /// Mints `initial_supply` to `owner` and grants it `Admin` and
        /// `FeeManager`. Fees start disabled with no treasury.
        #[ink(constructor)]
        pub fn new(
            owner: AccountId,
            initial_supply: Balance,
            name: String,
            symbol: String,
        ) -> Self {
            let caller = Self::env().caller();

            let mut balances = Mapping::default();
            balances.insert(owner, &initial_supply);

            let mut roles = AccessControl::default();
            for role in [Role::Admin, Role::FeeManager] {
                roles.grant(role, owner);
                Self::env().emit_event(RoleGranted {
                    role,
                    account: owner,
                    sender: caller,
                });
            }

            Self::env().emit_event(Transfer {
                from: None,
                to: Some(owner),
                value: initial_supply,
                fee: 0,
            });

            Self {
                name,
                symbol,
                decimals: DECIMALS,
                total_supply: initial_supply,
                balances,
                allowances: Mapping::default(),
                nonces: Mapping::default(),
                roles,
                fee_mode: FeeMode::None,
                fee_treasury: None,
                excluded_from_fees: Mapping::default(),
                storage_version: STORAGE_VERSION,
            }
        }

        // =====================================================================
        // PSP22: STANDARD TOKEN INTERFACE
        // =====================================================================

        #[ink(message)]
        pub fn name(&self) -> String { self.name.clone() }

        #[ink(message)]
        pub fn symbol(&self) -> String { self.symbol.clone() }

        #[ink(message)]
        pub fn decimals(&self) -> u8 { self.decimals }

        #[ink(message)]
        pub fn total_supply(&self) -> Balance { self.total_supply }

        #[ink(message)]
        pub fn balance_of(&self, account: AccountId) -> Balance {
            self.balances.get(account).unwrap_or(0)
        }

        #[ink(message)]
        pub fn allowance(&self, owner: AccountId, spender: AccountId) -> Balance {
            self.allowances.get((owner, spender)).unwrap_or(0)
        }

        #[ink(message)]
        pub fn approve(&mut self, spender: AccountId, value: Balance) -> Result<(), Error> {
            let owner = self.env().caller();
            self.approve_impl(owner, spender, value);
            Ok(())
        }

        #[ink(message)]
        pub fn transfer(&mut self, to: AccountId, value: Balance) -> Result<(), Error> {
            let from = self.env().caller();
            self.transfer_impl(from, to, value)
        }

        /// Fees are charged as if `from` had sent the transfer itself.
        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            from: AccountId,
            to: AccountId,
            value: Balance,
        ) -> Result<(), Error> {
            let caller = self.env().caller();
            let current_allowance = self.allowance(from, caller);
            if current_allowance < value {
                return Err(Error::InsufficientAllowance);
            }
            self.transfer_impl(from, to, value)?;
            self.allowances
                .insert((from, caller), &current_allowance.saturating_sub(value));
            Ok(())
        }

        // =====================================================================
        // BATCH TRANSFER
        // =====================================================================

        /// Send `amounts[i]` to `recipients[i]` for every `i`, all or nothing.
        ///
        /// The fee rule runs per leg against the shared sender, so a 1% fee
        /// on two legs of 100 charges 1 + 1, and a fixed fee is charged
        /// once per leg.
        #[ink(message)]
        pub fn batch_transfer(
            &mut self,
            recipients: Vec<AccountId>,
            amounts: Vec<Balance>,
        ) -> Result<(), Error> {
            if recipients.len() != amounts.len() {
                return Err(Error::LengthMismatch);
            }
            let from = self.env().caller();

            let mut legs = Vec::with_capacity(recipients.len());
            let mut total_debit: Balance = 0;
            for (to, amount) in recipients.into_iter().zip(amounts) {
                let fee = self.compute_fee(from, amount)?;
                // A total beyond u128 can never be covered by a balance.
                total_debit = total_debit
                    .checked_add(amount)
                    .ok_or(Error::InsufficientBalance)?;
                legs.push(TransferLeg {
                    to,
                    net: amount.saturating_sub(fee),
                    fee,
                });
            }

            self.settle(from, total_debit, &legs)
        }

        // =====================================================================
        // BURN
        // =====================================================================

        #[ink(message)]
        pub fn burn(&mut self, amount: Balance) -> Result<(), Error> {
            let from = self.env().caller();
            self.burn_impl(from, amount)
        }

        /// Burn from `owner` against the caller's allowance.
        #[ink(message)]
        pub fn burn_from(&mut self, owner: AccountId, amount: Balance) -> Result<(), Error> {
            let caller = self.env().caller();
            let current_allowance = self.allowance(owner, caller);
            if current_allowance < amount {
                return Err(Error::InsufficientAllowance);
            }
            self.burn_impl(owner, amount)?;
            self.allowances
                .insert((owner, caller), &current_allowance.saturating_sub(amount));
            Ok(())
        }

        // =====================================================================
        // PERMITS
        // =====================================================================

        #[ink(message)]
        pub fn nonces(&self, owner: AccountId) -> u64 {
            self.nonces.get(owner).unwrap_or(0)
        }

        /// Digest the owner must sign to authorise `spender` for `value`.
        /// Binds the token name and contract address, so a signature for
        /// one deployment is worthless on another.
        #[ink(message)]
        pub fn permit_digest(
            &self,
            owner: AccountId,
            spender: AccountId,
            value: Balance,
            nonce: u64,
            deadline: Timestamp,
        ) -> [u8; 32] {
            let payload = (
                PERMIT_DOMAIN,
                self.name.as_bytes(),
                self.env().account_id(),
                owner,
                spender,
                value,
                nonce,
                deadline,
            );
            self.env().hash_encoded::<Keccak256, _>(&payload)
        }

        /// Set `allowance(owner, spender) = value` from an off-chain signature.
        ///
        /// # Errors
        /// - [`Error::SignatureExpired`]: block timestamp is past `deadline`.
        /// - [`Error::InvalidSignature`]: wrong signer, or signed for a
        ///   nonce other than the current one.
        #[ink(message)]
        pub fn permit(
            &mut self,
            owner: AccountId,
            spender: AccountId,
            value: Balance,
            deadline: Timestamp,
            signature: [u8; 65],
        ) -> Result<(), Error> {
            let next_nonce = self.verify_permit(owner, spender, value, deadline, &signature)?;
            self.nonces.insert(owner, &next_nonce);
            self.approve_impl(owner, spender, value);
            Ok(())
        }

        /// Delegated burn: the caller, acting as `spender`, redeems the
        /// owner's permit and burns `amount` from the owner in one call.
        ///
        /// All checks run before the nonce, allowance or balance is written.
        #[ink(message)]
        pub fn burn_with_permit(
            &mut self,
            owner: AccountId,
            spender: AccountId,
            amount: Balance,
            deadline: Timestamp,
            signature: [u8; 65],
        ) -> Result<(), Error> {
            if self.env().caller() != spender {
                return Err(Error::Unauthorized);
            }
            let next_nonce = self.verify_permit(owner, spender, amount, deadline, &signature)?;
            if self.balance_of(owner) < amount {
                return Err(Error::InsufficientBalance);
            }

            self.nonces.insert(owner, &next_nonce);
            self.approve_impl(owner, spender, amount);
            self.burn_from(owner, amount)
        }

        // =====================================================================
        // FEE CONFIGURATION (FeeManager)
        // =====================================================================

        #[ink(message)]
        pub fn set_fee_mode(&mut self, mode: FeeMode) -> Result<(), Error> {
            self.only_role(Role::FeeManager)?;
            if let FeeMode::Percentage(bps) = mode {
                if Balance::from(bps) > BPS_DENOMINATOR {
                    return Err(Error::InvalidFeeMode);
                }
            }
            self.fee_mode = mode;
            self.env().emit_event(FeeModeChanged {
                mode,
                sender: self.env().caller(),
            });
            Ok(())
        }

        #[ink(message)]
        pub fn set_fee_treasury_address(&mut self, treasury: AccountId) -> Result<(), Error> {
            self.only_role(Role::FeeManager)?;
            let previous = self.fee_treasury.replace(treasury);
            self.env().emit_event(FeeTreasuryChanged { previous, treasury });
            Ok(())
        }

        #[ink(message)]
        pub fn set_excluded_from_fees(
            &mut self,
            account: AccountId,
            is_excluded: bool,
        ) -> Result<(), Error> {
            self.only_role(Role::FeeManager)?;
            if is_excluded {
                self.excluded_from_fees.insert(account, &());
            } else {
                self.excluded_from_fees.remove(account);
            }
            self.env().emit_event(ExclusionChanged {
                account,
                excluded: is_excluded,
            });
            Ok(())
        }

        #[ink(message)]
        pub fn get_fee_mode(&self) -> FeeMode { self.fee_mode }

        #[ink(message)]
        pub fn fee_treasury(&self) -> Option<AccountId> { self.fee_treasury }

        #[ink(message)]
        pub fn is_excluded_from_fees(&self, account: AccountId) -> bool {
            self.excluded_from_fees.contains(account)
        }

        /// Preview a transfer of `amount` sent by `from`: returns `(fee, net)`.
        #[ink(message)]
        pub fn preview_fee(&self, from: AccountId, amount: Balance) -> Result<(Balance, Balance), Error> {
            let fee = self.compute_fee(from, amount)?;
            Ok((fee, amount.saturating_sub(fee)))
        }

        // =====================================================================
        // ROLES (Admin)
        // =====================================================================

        #[ink(message)]
        pub fn has_role(&self, role: Role, account: AccountId) -> bool {
            self.roles.has_role(role, account)
        }

        #[ink(message)]
        pub fn grant_role(&mut self, role: Role, account: AccountId) -> Result<(), Error> {
            self.only_role(Role::Admin)?;
            if self.roles.grant(role, account) {
                self.env().emit_event(RoleGranted {
                    role,
                    account,
                    sender: self.env().caller(),
                });
            }
            Ok(())
        }

        #[ink(message)]
        pub fn revoke_role(&mut self, role: Role, account: AccountId) -> Result<(), Error> {
            self.only_role(Role::Admin)?;
            if self.roles.revoke(role, account) {
                self.env().emit_event(RoleRevoked {
                    role,
                    account,
                    sender: self.env().caller(),
                });
            }
            Ok(())
        }

        /// Drop one of the caller's own roles.
        #[ink(message)]
        pub fn renounce_role(&mut self, role: Role) -> Result<(), Error> {
            let caller = self.env().caller();
            if self.roles.revoke(role, caller) {
                self.env().emit_event(RoleRevoked {
                    role,
                    account: caller,
                    sender: caller,
                });
            }
            Ok(())
        }

        // =====================================================================
        // UPGRADES (Admin)
        // =====================================================================

        /// Swap the contract code in place. Storage and address survive.
        #[ink(message)]
        pub fn upgrade_to(&mut self, code_hash: Hash) -> Result<(), Error> {
            self.only_role(Role::Admin)?;
            self.env()
                .set_code_hash(&code_hash)
                .map_err(|_| Error::UpgradeFailed)?;
            self.env().emit_event(Upgraded { code_hash });
            Ok(())
        }

        #[ink(message)]
        pub fn storage_version(&self) -> u16 { self.storage_version }

        // =====================================================================
        // INTERNAL HELPERS
        // =====================================================================

        fn compute_fee(&self, from: AccountId, amount: Balance) -> Result<Balance, Error> {
            if self.is_excluded_from_fees(from) {
                return Ok(0);
            }
            let fee = match self.fee_mode {
                FeeMode::None => 0,
                FeeMode::Percentage(bps) => {
                    // floor(amount × bps / D) split so the product cannot overflow.
                    let bps = Balance::from(bps);
                    (amount / BPS_DENOMINATOR) * bps
                        + (amount % BPS_DENOMINATOR) * bps / BPS_DENOMINATOR
                }
                FeeMode::Fixed(fee) => {
                    if fee > amount {
                        return Err(Error::InsufficientAmount);
                    }
                    fee
                }
            };
            if fee > 0 && self.configured_treasury().is_none() {
                return Err(Error::TreasuryNotConfigured);
            }
            Ok(fee)
        }

        /// Treasury that can receive fees. The zero account reads as unset.
        fn configured_treasury(&self) -> Option<AccountId> {
            self.fee_treasury
                .filter(|treasury| *treasury != AccountId::from(ZERO_ACCOUNT))
        }

        fn transfer_impl(&mut self, from: AccountId, to: AccountId, value: Balance) -> Result<(), Error> {
            let fee = self.compute_fee(from, value)?;
            let leg = TransferLeg {
                to,
                net: value.saturating_sub(fee),
                fee,
            };
            self.settle(from, value, &[leg])
        }

        /// Debit `total_debit` from `from` and pay out every leg.
        ///
        /// The balance check is the last fallible step before writing; the
        /// credits cannot overflow because balances sum to `total_supply`.
        fn settle(&mut self, from: AccountId, total_debit: Balance, legs: &[TransferLeg]) -> Result<(), Error> {
            let from_balance = self.balance_of(from);
            if from_balance < total_debit {
                return Err(Error::InsufficientBalance);
            }
            self.balances
                .insert(from, &from_balance.saturating_sub(total_debit));

            for leg in legs {
                self.credit_balance(leg.to, leg.net)?;
                if leg.fee > 0 {
                    if let Some(treasury) = self.configured_treasury() {
                        self.credit_balance(treasury, leg.fee)?;
                    }
                }
                self.env().emit_event(Transfer {
                    from: Some(from),
                    to: Some(leg.to),
                    value: leg.net,
                    fee: leg.fee,
                });
            }
            Ok(())
        }

        fn burn_impl(&mut self, from: AccountId, amount: Balance) -> Result<(), Error> {
            let balance = self.balance_of(from);
            if balance < amount {
                return Err(Error::InsufficientBalance);
            }
            self.balances.insert(from, &balance.saturating_sub(amount));
            self.total_supply = self.total_supply.saturating_sub(amount);

            self.env().emit_event(Burn {
                from,
                amount,
                new_total_supply: self.total_supply,
            });
            self.env().emit_event(Transfer {
                from: Some(from),
                to: None,
                value: amount,
                fee: 0,
            });
            Ok(())
        }

        fn credit_balance(&mut self, account: AccountId, amount: Balance) -> Result<(), Error> {
            let balance = self.balance_of(account);
            let new_balance = balance.checked_add(amount).ok_or(Error::Overflow)?;
            self.balances.insert(account, &new_balance);
            Ok(())
        }

        fn approve_impl(&mut self, owner: AccountId, spender: AccountId, value: Balance) {
            self.allowances.insert((owner, spender), &value);
            self.env().emit_event(Approval { owner, spender, value });
        }

        /// Checks deadline and signature; returns the owner's next nonce.
        fn verify_permit(
            &self,
            owner: AccountId,
            spender: AccountId,
            value: Balance,
            deadline: Timestamp,
            signature: &[u8; 65],
        ) -> Result<u64, Error> {
            if self.env().block_timestamp() > deadline {
                return Err(Error::SignatureExpired);
            }
            let nonce = self.nonces(owner);
            let digest = self.permit_digest(owner, spender, value, nonce, deadline);
            let public_key = self
                .env()
                .ecdsa_recover(signature, &digest)
                .map_err(|_| Error::InvalidSignature)?;
            let signer = AccountId::from(self.env().hash_bytes::<Blake2x256>(&public_key));
            if signer != owner {
                return Err(Error::InvalidSignature);
            }
            nonce.checked_add(1).ok_or(Error::Overflow)
        }

        fn only_role(&self, role: Role) -> Result<(), Error> {
            if !self.roles.has_role(role, self.env().caller()) {
                return Err(Error::Unauthorized);
            }
            Ok(())
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================


    // =========================================================================
    // END-TO-END TESTS
    // =========================================================================

}
