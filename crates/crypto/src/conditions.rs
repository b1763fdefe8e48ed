//! Access control conditions.
//!
//! The JSON shape follows the one used by threshold encryption networks: a list of condition
//! objects separated by `{"operator": "and" | "or"}` entries. `and` binds tighter than `or`.
//!
//! Only wallet-address conditions (`parameters: [":userAddress"]` with `=` or `!=`) can be
//! evaluated locally. Any other shape is rejected as unsupported rather than ignored.

use crate::{CryptoError, CryptoResult, WalletAddress};
use serde::{Deserialize, Serialize};

const USER_ADDRESS: &str = ":userAddress";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub comparator: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlCondition {
    pub chain: String,
    #[serde(default = "default_condition_type")]
    pub condition_type: String,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub method: String,
    pub parameters: Vec<String>,
    pub return_value_test: ReturnValueTest,
    #[serde(default)]
    pub standard_contract_type: String,
}

fn default_condition_type() -> String {
    "evmBasic".to_string()
}

impl AccessControlCondition {
    /// The condition satisfied only by `address`.
    pub fn wallet_owner(address: &WalletAddress) -> Self {
        Self {
            chain: "ethereum".to_string(),
            condition_type: default_condition_type(),
            contract_address: String::new(),
            method: String::new(),
            parameters: vec![USER_ADDRESS.to_string()],
            return_value_test: ReturnValueTest {
                comparator: "=".to_string(),
                value: address.to_string(),
            },
            standard_contract_type: String::new(),
        }
    }

    /// Checks that the condition can be evaluated locally.
    pub fn check_supported(&self) -> CryptoResult<()> {
        let wallet_check = self.parameters.len() == 1
            && self.parameters[0] == USER_ADDRESS
            && self.method.is_empty()
            && self.contract_address.is_empty()
            && self.standard_contract_type.is_empty();
        if !wallet_check {
            return Err(CryptoError::UnsupportedCondition(format!(
                "only {USER_ADDRESS} comparisons are supported (method '{}', parameters {:?})",
                self.method, self.parameters
            )));
        }
        match self.return_value_test.comparator.as_str() {
            "=" | "!=" => {}
            other => {
                return Err(CryptoError::UnsupportedCondition(format!(
                    "comparator '{other}'"
                )))
            }
        }
        WalletAddress::parse(&self.return_value_test.value)?;
        Ok(())
    }

    pub fn evaluate(&self, user: &WalletAddress) -> CryptoResult<bool> {
        self.check_supported()?;
        let expected = WalletAddress::parse(&self.return_value_test.value)?;
        let equal = &expected == user;
        Ok(match self.return_value_test.comparator.as_str() {
            "=" => equal,
            _ => !equal,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    And,
    Or,
}

/// One element of a condition list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionEntry {
    Operator(OperatorEntryWire),
    Condition(AccessControlCondition),
}

/// Wire form of an operator entry (`{"operator": "or"}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorEntryWire {
    pub operator: BooleanOperator,
}

impl ConditionEntry {
    fn operator(op: BooleanOperator) -> Self {
        ConditionEntry::Operator(OperatorEntryWire { operator: op })
    }
}

/// A boolean expression over access control conditions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy(Vec<ConditionEntry>);

impl AccessPolicy {
    /// A policy granting access to `address` only.
    pub fn owner(address: &WalletAddress) -> Self {
        Self(vec![ConditionEntry::Condition(
            AccessControlCondition::wallet_owner(address),
        )])
    }

    pub fn from_entries(entries: Vec<ConditionEntry>) -> CryptoResult<Self> {
        let policy = Self(entries);
        policy.validate()?;
        Ok(policy)
    }

    /// Adds `condition` as an alternative to the current policy.
    pub fn or(self, condition: AccessControlCondition) -> Self {
        self.join(BooleanOperator::Or, condition)
    }

    /// Adds `condition` as a further requirement of the last alternative.
    pub fn and(self, condition: AccessControlCondition) -> Self {
        self.join(BooleanOperator::And, condition)
    }

    fn join(mut self, op: BooleanOperator, condition: AccessControlCondition) -> Self {
        if !self.0.is_empty() {
            self.0.push(ConditionEntry::operator(op));
        }
        self.0.push(ConditionEntry::Condition(condition));
        self
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.0
    }

    /// Checks the list is non-empty, alternates condition/operator and uses only supported
    /// conditions.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.0.is_empty() {
            return Err(CryptoError::MalformedPolicy(
                "at least one condition is required".into(),
            ));
        }
        for (i, entry) in self.0.iter().enumerate() {
            match (i % 2 == 0, entry) {
                (true, ConditionEntry::Condition(c)) => c.check_supported()?,
                (false, ConditionEntry::Operator(_)) => {}
                _ => {
                    return Err(CryptoError::MalformedPolicy(format!(
                        "entry {i} breaks the condition/operator alternation"
                    )))
                }
            }
        }
        if self.0.len() % 2 == 0 {
            return Err(CryptoError::MalformedPolicy(
                "policy ends with an operator".into(),
            ));
        }
        Ok(())
    }

    /// Evaluates the policy for `user`.
    pub fn evaluate(&self, user: &WalletAddress) -> CryptoResult<bool> {
        self.validate()?;

        let mut any_group = false;
        let mut group = true;
        for entry in &self.0 {
            match entry {
                ConditionEntry::Condition(c) => group &= c.evaluate(user)?,
                ConditionEntry::Operator(OperatorEntryWire {
                    operator: BooleanOperator::And,
                }) => {}
                ConditionEntry::Operator(OperatorEntryWire {
                    operator: BooleanOperator::Or,
                }) => {
                    any_group |= group;
                    group = true;
                }
            }
        }
        Ok(any_group || group)
    }

    /// Fails with [`CryptoError::AccessDenied`] unless `user` satisfies the policy.
    pub fn authorize(&self, user: &WalletAddress) -> CryptoResult<()> {
        if self.evaluate(user)? {
            Ok(())
        } else {
            Err(CryptoError::AccessDenied(user.clone()))
        }
    }

    /// Stable JSON encoding used for key derivation and as associated data.
    pub fn canonical_json(&self) -> CryptoResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}
