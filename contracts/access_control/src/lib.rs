#![cfg_attr(not(feature = "std"), no_std)]

//! # BNext: Role-Based Access Control
//!
//! Role-membership table shared by the `bnext` and `bnext_bonus` contracts.
//!
//! The table is an `#[ink::storage_item]` embedded in each contract's root
//! storage. It only records membership; the contracts decide which role a
//! message requires and check the caller themselves before mutating state.
//!
//! ```text
//! Role::Admin       grant / revoke any role, pause, allow-list, upgrades
//! Role::FeeManager  fee mode, fee treasury, fee exemptions  (bnext only)
//! ```
//!
//! The role events live here too so both contracts emit one definition.

use ink::primitives::AccountId;
use ink::storage::Mapping;

/// Role identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
pub enum Role {
    /// Self-bootstrapped at construction. Can grant and revoke every role,
    /// including its own.
    Admin,
    /// Configures the transfer fee engine.
    FeeManager,
}

// =========================================================================
// EVENTS
// =========================================================================

#[ink::event]
pub struct RoleGranted {
    #[ink(topic)]
    pub role: Role,
    #[ink(topic)]
    pub account: AccountId,
    pub sender: AccountId,
}

#[ink::event]
pub struct RoleRevoked {
    #[ink(topic)]
    pub role: Role,
    #[ink(topic)]
    pub account: AccountId,
    pub sender: AccountId,
}

// =========================================================================
// STORAGE
// =========================================================================

#[ink::storage_item]
#[derive(Debug, Default)]
pub struct AccessControl {
    members: Mapping<(Role, AccountId), ()>,
}

impl AccessControl {
    pub fn has_role(&self, role: Role, account: AccountId) -> bool {
        self.members.contains((role, account))
    }

    /// Adds `account` to `role`. Returns `false` if it was already a member.
    pub fn grant(&mut self, role: Role, account: AccountId) -> bool {
        if self.has_role(role, account) {
            return false;
        }
        self.members.insert((role, account), &());
        true
    }

    /// Removes `account` from `role`. Returns `false` if it was not a member.
    pub fn revoke(&mut self, role: Role, account: AccountId) -> bool {
        if !self.has_role(role, account) {
            return false;
        }
        self.members.remove((role, account));
        true
    }
}

// =========================================================================
// UNIT TESTS
// =========================================================================
