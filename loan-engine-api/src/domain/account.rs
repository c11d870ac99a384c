use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Borrower or operator. Credential verification and field-level encryption
/// of `encrypted_national_id` are external collaborators — this engine
/// treats both fields as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: HeaplessString<254>,
    pub credential_hash: HeaplessString<128>,
    pub role: AccountRole,
    pub active: bool,
    pub encrypted_national_id: Option<HeaplessString<256>>,
    pub credit_score: Option<i32>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountRole {
    Borrower,
    Operator,
}

impl Account {
    pub fn is_operator(&self) -> bool {
        matches!(self.role, AccountRole::Operator)
    }
}
