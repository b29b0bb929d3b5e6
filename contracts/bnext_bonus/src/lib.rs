#![cfg_attr(not(feature = "std"), no_std, no_main)]

pub use self::bnext_bonus::{BNextBonus, BNextBonusRef, Error};

/// # BNext Bonus: Reserve-Backed Bonus Ledger
///
/// **Role:** secondary ledger (`BNXT_B`) whose every transfer is mirrored
/// by a real BNXT payout from this contract's own BNXT balance (the
/// reserve).
///
/// ## Transfer Flow
///
/// ```text
/// 1. ledger not paused                      else Paused
/// 2. sender on the allow-list               else NotAllowedToTransfer
/// 3. sender bonus balance >= amount         else InsufficientBalance
/// 4. bnext.transfer(to, amount)             reserve → recipient
///      InsufficientBalance on bnext         → InsufficientReserve
///      any other failure                    → UnderlyingTransferFailed
/// 5. debit sender, credit recipient         bonus balances written last
/// ```
///
/// Nothing is written to bonus storage until the nested call returns
/// `Ok`, so a failed payout leaves both ledgers unchanged.
///
/// A self-transfer (`to == sender`) still pays `amount` of reserve to the
/// sender while the bonus balance nets to zero.
///
/// For an exact 1:1 peg this contract's account must be excluded from
/// fees on the primary ledger. Otherwise the recipient receives the
/// amount minus the BNXT fee while the reserve still drops by the amount.
#[ink::contract]
pub mod bnext_bonus {
    use access_control::{AccessControl, Role, RoleGranted, RoleRevoked};
    use bnext::{Approval, Upgraded};
    use ink::env::call::{build_call, ExecutionInput, Selector};
    use ink::env::DefaultEnvironment;
    use ink::prelude::string::String;
    use ink::storage::Mapping;

    // =========================================================================
    // CONSTANTS
    // =========================================================================

    pub const DECIMALS: u8 = 18;

    pub const STORAGE_VERSION: u16 = 1;

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct BNextBonus {
        // ── Token metadata ─────────────────────────────────────────────────
        name: String,
        symbol: String,
        decimals: u8,

        // ── Bonus ledger ───────────────────────────────────────────────────
        total_supply: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,

        // ── Administration ─────────────────────────────────────────────────
        roles: AccessControl,
        allowed_to_transfer: Mapping<AccountId, ()>,
        paused: bool,

        /// Primary ledger contract holding the reserve.
        underlying_token: AccountId,

        storage_version: u16,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[ink(event)]
    pub struct Transfer {
        #[ink(topic)]
        from: Option<AccountId>,
        #[ink(topic)]
        to: Option<AccountId>,
        value: Balance,
    }

    #[ink(event)]
    pub struct Paused {
        #[ink(topic)]
        account: AccountId,
    }

    #[ink(event)]
    pub struct Unpaused {
        #[ink(topic)]
        account: AccountId,
    }

    #[ink(event)]
    pub struct AllowListChanged {
        #[ink(topic)]
        account: AccountId,
        allowed: bool,
    }

    /// Reserve paid out by an admin without touching bonus balances.
    #[ink(event)]
    pub struct ReserveWithdrawn {
        #[ink(topic)]
        to: AccountId,
        amount: Balance,
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        /// Caller lacks the `Admin` role.
        Unauthorized,
        /// Sender's bonus balance is below the amount.
        InsufficientBalance,
        /// Spender's bonus allowance is below the amount.
        InsufficientAllowance,
        /// Transfers are paused, or `pause` was called while paused.
        Paused,
        /// `unpause` was called on an active ledger.
        NotPaused,
        /// Sender is not on the transfer allow-list.
        NotAllowedToTransfer,
        /// The primary ledger reports the reserve cannot cover the payout.
        InsufficientReserve,
        /// The nested primary-ledger call failed for any other reason.
        UnderlyingTransferFailed,
        /// An arithmetic operation overflowed.
        Overflow,
        /// `set_code_hash` was rejected by the runtime.
        UpgradeFailed,
        /// Reading the reserve from the primary ledger failed.
        ReserveReadFailed,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl BNextBonus {
        /// Mints `initial_supply` bonus units to `owner`, grants it `Admin`
        /// and puts it on the allow-list. `underlying_token` is the
        /// primary ledger whose balance of this contract is the reserve.
        #[ink(constructor)]
        pub fn new(
            owner: AccountId,
            initial_supply: Balance,
            name: String,
            symbol: String,
            underlying_token: AccountId,
        ) -> Self {
            let caller = Self::env().caller();

            let mut balances = Mapping::default();
            balances.insert(owner, &initial_supply);

            let mut roles = AccessControl::default();
            roles.grant(Role::Admin, owner);

            let mut allowed_to_transfer = Mapping::default();
            allowed_to_transfer.insert(owner, &());

            Self::env().emit_event(RoleGranted {
                role: Role::Admin,
                account: owner,
                sender: caller,
            });
            Self::env().emit_event(AllowListChanged {
                account: owner,
                allowed: true,
            });
            Self::env().emit_event(Transfer {
                from: None,
                to: Some(owner),
                value: initial_supply,
            });

            Self {
                name,
                symbol,
                decimals: DECIMALS,
                total_supply: initial_supply,
                balances,
                allowances: Mapping::default(),
                roles,
                allowed_to_transfer,
                paused: false,
                underlying_token,
                storage_version: STORAGE_VERSION,
            }
        }

        // =====================================================================
        // VIEW FUNCTIONS
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
        pub fn paused(&self) -> bool { self.paused }

        #[ink(message)]
        pub fn is_address_allowed_to_transfer(&self, account: AccountId) -> bool {
            self.allowed_to_transfer.contains(account)
        }

        #[ink(message)]
        pub fn underlying_token(&self) -> AccountId { self.underlying_token }

        /// BNXT held by this contract on the primary ledger.
        ///
        /// # Errors
        /// - [`Error::ReserveReadFailed`]: the primary ledger call failed or
        ///   returned something other than a balance.
        #[ink(message)]
        pub fn reserve_balance(&self) -> Result<Balance, Error> {
            let result: Result<ink::MessageResult<Balance>, ink::env::Error> =
                build_call::<DefaultEnvironment>()
                    .call(self.underlying_token)
                    .exec_input(
                        ExecutionInput::new(Selector::new(ink::selector_bytes!("balance_of")))
                            .push_arg(self.env().account_id()),
                    )
                    .returns::<Balance>()
                    .try_invoke();

            match result {
                Ok(Ok(balance)) => Ok(balance),
                _ => Err(Error::ReserveReadFailed),
            }
        }

        #[ink(message)]
        pub fn has_role(&self, role: Role, account: AccountId) -> bool {
            self.roles.has_role(role, account)
        }

        #[ink(message)]
        pub fn storage_version(&self) -> u16 { self.storage_version }

        // =====================================================================
        // TRANSFERS
        // =====================================================================

        #[ink(message)]
        pub fn approve(&mut self, spender: AccountId, value: Balance) -> Result<(), Error> {
            let owner = self.env().caller();
            self.allowances.insert((owner, spender), &value);
            self.env().emit_event(Approval { owner, spender, value });
            Ok(())
        }

        /// Move `amount` bonus units to `to`, paying out the same amount of
        /// BNXT from the reserve.
        #[ink(message)]
        pub fn transfer(&mut self, to: AccountId, amount: Balance) -> Result<(), Error> {
            let from = self.env().caller();
            self.transfer_impl(from, to, amount)
        }

        /// Allowance-based transfer. `from` must be allow-listed; the
        /// caller only needs an allowance.
        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            from: AccountId,
            to: AccountId,
            amount: Balance,
        ) -> Result<(), Error> {
            let caller = self.env().caller();
            let current_allowance = self.allowance(from, caller);
            if current_allowance < amount {
                return Err(Error::InsufficientAllowance);
            }
            self.transfer_impl(from, to, amount)?;
            self.allowances
                .insert((from, caller), &current_allowance.saturating_sub(amount));
            Ok(())
        }

        // =====================================================================
        // ADMINISTRATION (Admin)
        // =====================================================================

        #[ink(message)]
        pub fn pause(&mut self) -> Result<(), Error> {
            self.only_admin()?;
            if self.paused {
                return Err(Error::Paused);
            }
            self.paused = true;
            self.env().emit_event(Paused {
                account: self.env().caller(),
            });
            Ok(())
        }

        #[ink(message)]
        pub fn unpause(&mut self) -> Result<(), Error> {
            self.only_admin()?;
            if !self.paused {
                return Err(Error::NotPaused);
            }
            self.paused = false;
            self.env().emit_event(Unpaused {
                account: self.env().caller(),
            });
            Ok(())
        }

        #[ink(message)]
        pub fn set_is_address_allowed_to_transfer(
            &mut self,
            account: AccountId,
            allowed: bool,
        ) -> Result<(), Error> {
            self.only_admin()?;
            if allowed {
                self.allowed_to_transfer.insert(account, &());
            } else {
                self.allowed_to_transfer.remove(account);
            }
            self.env().emit_event(AllowListChanged { account, allowed });
            Ok(())
        }

        /// Pay `amount` of the reserve to `to`. Works while paused.
        #[ink(message)]
        pub fn withdraw_underlying_token(
            &mut self,
            to: AccountId,
            amount: Balance,
        ) -> Result<(), Error> {
            self.only_admin()?;
            self.pay_from_reserve(to, amount)?;
            self.env().emit_event(ReserveWithdrawn { to, amount });
            Ok(())
        }

        #[ink(message)]
        pub fn grant_role(&mut self, role: Role, account: AccountId) -> Result<(), Error> {
            self.only_admin()?;
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
            self.only_admin()?;
            if self.roles.revoke(role, account) {
                self.env().emit_event(RoleRevoked {
                    role,
                    account,
                    sender: self.env().caller(),
                });
            }
            Ok(())
        }

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

        #[ink(message)]
        pub fn upgrade_to(&mut self, code_hash: Hash) -> Result<(), Error> {
            self.only_admin()?;
            self.env()
                .set_code_hash(&code_hash)
                .map_err(|_| Error::UpgradeFailed)?;
            self.env().emit_event(Upgraded { code_hash });
            Ok(())
        }

        // =====================================================================
        // INTERNAL HELPERS
        // =====================================================================

        fn transfer_impl(&mut self, from: AccountId, to: AccountId, amount: Balance) -> Result<(), Error> {
            if self.paused {
                return Err(Error::Paused);
            }
            if !self.is_address_allowed_to_transfer(from) {
                return Err(Error::NotAllowedToTransfer);
            }
            let from_balance = self.balance_of(from);
            if from_balance < amount {
                return Err(Error::InsufficientBalance);
            }

            self.pay_from_reserve(to, amount)?;

            self.balances
                .insert(from, &from_balance.saturating_sub(amount));
            // Read after the debit so a self-transfer nets to zero.
            let to_balance = self.balance_of(to);
            let new_to_balance = to_balance.checked_add(amount).ok_or(Error::Overflow)?;
            self.balances.insert(to, &new_to_balance);

            self.env().emit_event(Transfer {
                from: Some(from),
                to: Some(to),
                value: amount,
            });
            Ok(())
        }

        /// `bnext.transfer(to, amount)` with this contract as the sender.
        fn pay_from_reserve(&mut self, to: AccountId, amount: Balance) -> Result<(), Error> {
            let result: Result<ink::MessageResult<Result<(), bnext::Error>>, ink::env::Error> =
                build_call::<DefaultEnvironment>()
                    .call(self.underlying_token)
                    .exec_input(
                        ExecutionInput::new(Selector::new(ink::selector_bytes!("transfer")))
                            .push_arg(to)
                            .push_arg(amount),
                    )
                    .returns::<Result<(), bnext::Error>>()
                    .try_invoke();

            match result {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(bnext::Error::InsufficientBalance))) => Err(Error::InsufficientReserve),
                _ => Err(Error::UnderlyingTransferFailed),
            }
        }

        fn only_admin(&self) -> Result<(), Error> {
            if !self.roles.has_role(Role::Admin, self.env().caller()) {
                return Err(Error::Unauthorized);
            }
            Ok(())
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================
    //
    // The off-chain engine cannot execute cross-contract calls, so these
    // cover every path that is decided before the reserve payout. Payouts
    // are exercised in `e2e_tests` below.


    // =========================================================================
    // END-TO-END TESTS
    // =========================================================================

}
