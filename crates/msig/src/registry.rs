//! multisig registry model: owner sets, creation parameters and their invariants
use {
    crate::{
        error::ValidationError,
        programs::multisig::{
            accounts::{pack_str, MultisigAccount, OwnerData},
            instructions::{CreateMultisigArgs, EditMultisigArgs, Owner},
            pda::derive_authority,
            LABEL_LEN, MAX_OWNERS, OWNER_NAME_LEN,
        },
        status::QuorumPolicy,
    },
    serde::{Deserialize, Serialize},
    solana_sdk::pubkey::Pubkey,
    std::collections::HashSet,
};

/// checks an owner set against the rules the program enforces
pub fn validate_owners(owners: &[Owner], threshold: u64) -> Result<(), ValidationError> {
    if owners.is_empty() {
        return Err(ValidationError::NoOwners);
    }
    if owners.len() > MAX_OWNERS {
        return Err(ValidationError::TooManyOwners {
            max: MAX_OWNERS,
            count: owners.len(),
        });
    }
    if threshold == 0 || threshold > owners.len() as u64 {
        return Err(ValidationError::InvalidThreshold {
            threshold,
            owners: owners.len(),
        });
    }
    let mut seen = HashSet::with_capacity(owners.len());
    for owner in owners {
        if owner.address == Pubkey::default() {
            return Err(ValidationError::DefaultOwner);
        }
        if !seen.insert(owner.address) {
            return Err(ValidationError::DuplicateOwner(owner.address));
        }
        if owner.name.len() > OWNER_NAME_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "owner name",
                max: OWNER_NAME_LEN,
                len: owner.name.len(),
            });
        }
    }
    Ok(())
}

/// packs owners into the fixed owner array, remaining slots stay default
pub fn owner_slots(owners: &[Owner]) -> Result<[OwnerData; MAX_OWNERS], ValidationError> {
    let mut slots = [OwnerData::default(); MAX_OWNERS];
    if owners.len() > MAX_OWNERS {
        return Err(ValidationError::TooManyOwners {
            max: MAX_OWNERS,
            count: owners.len(),
        });
    }
    for (slot, owner) in slots.iter_mut().zip(owners) {
        *slot = OwnerData {
            address: owner.address,
            name: pack_str("owner name", &owner.name)?,
        };
    }
    Ok(slots)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigParams {
    pub label: String,
    pub threshold: u64,
    pub owners: Vec<Owner>,
    #[serde(default)]
    pub cool_off_period_in_seconds: u64,
}

impl MultisigParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_owners(&self.owners, self.threshold)?;
        if self.label.len() > LABEL_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "label",
                max: LABEL_LEN,
                len: self.label.len(),
            });
        }
        Ok(())
    }

    pub fn create_args(&self, nonce: u8) -> CreateMultisigArgs {
        CreateMultisigArgs {
            owners: self.owners.clone(),
            threshold: self.threshold,
            nonce,
            label: self.label.clone(),
            cool_off_period_in_seconds: self.cool_off_period_in_seconds,
        }
    }

    pub fn edit_args(&self) -> EditMultisigArgs {
        EditMultisigArgs {
            owners: self.owners.clone(),
            threshold: self.threshold,
            label: self.label.clone(),
            cool_off_period_in_seconds: self.cool_off_period_in_seconds,
        }
    }
}

/// decoded view over either multisig layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigInfo {
    #[serde(with = "crate::types::pubkey_string")]
    pub address: Pubkey,
    pub version: u8,
    pub label: String,
    #[serde(with = "crate::types::pubkey_string")]
    pub authority: Pubkey,
    pub nonce: u8,
    pub owner_set_seqno: u32,
    pub threshold: u64,
    pub pending_txs: u64,
    pub created_on: u64,
    pub cool_off_period_in_seconds: u64,
    pub owners: Vec<Owner>,
}

impl MultisigInfo {
    pub fn from_account(program_id: &Pubkey, address: Pubkey, account: &MultisigAccount) -> Self {
        let (label, pending_txs, created_on) = match account {
            MultisigAccount::V2(ms) => (ms.label(), ms.pending_txs, ms.created_on),
            MultisigAccount::V1(ms) => (
                crate::programs::multisig::accounts::unpack_str(&ms.label),
                ms.pending_txs,
                ms.created_on,
            ),
        };
        Self {
            address,
            version: account.version(),
            label,
            authority: derive_authority(program_id, &address).0,
            nonce: account.nonce(),
            owner_set_seqno: account.owner_set_seqno(),
            threshold: account.threshold(),
            pending_txs,
            created_on,
            cool_off_period_in_seconds: account.cool_off_period_in_seconds(),
            owners: account
                .live_owners()
                .into_iter()
                .map(|(address, name)| Owner { address, name })
                .collect(),
        }
    }

    pub fn policy(&self) -> QuorumPolicy {
        QuorumPolicy {
            threshold: self.threshold,
            owner_set_seqno: self.owner_set_seqno,
            live_owner_count: self.owners.len(),
            cool_off_period_in_seconds: self.cool_off_period_in_seconds,
        }
    }

    pub fn is_owner(&self, key: &Pubkey) -> bool {
        self.owners.iter().any(|owner| owner.address == *key)
    }

    pub fn owner(&self, key: &Pubkey) -> Option<&Owner> {
        self.owners.iter().find(|owner| owner.address == *key)
    }

    /// threshold within the live owner count, unique owners, nonce matching the authority bump
    pub fn check_invariants(&self, program_id: &Pubkey) -> Result<(), ValidationError> {
        validate_owners(&self.owners, self.threshold)?;
        let (authority, bump) = derive_authority(program_id, &self.address);
        if authority != self.authority || (self.version >= 2 && bump != self.nonce) {
            log::warn!(
                "multisig {} nonce {} does not match authority bump {bump}",
                self.address,
                self.nonce
            );
            return Err(ValidationError::InvalidNonce {
                expected: bump,
                found: self.nonce,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::programs::multisig::accounts::MultisigV2,
    };

    fn owners(n: usize) -> Vec<Owner> {
        (0..n)
            .map(|i| Owner {
                address: Pubkey::new_unique(),
                name: format!("owner {i}"),
            })
            .collect()
    }

    #[test]
    fn test_validate_owners() {
        assert_eq!(validate_owners(&[], 1), Err(ValidationError::NoOwners));
        assert!(validate_owners(&owners(3), 3).is_ok());
        assert_eq!(
            validate_owners(&owners(3), 4),
            Err(ValidationError::InvalidThreshold {
                threshold: 4,
                owners: 3
            })
        );
        assert!(matches!(
            validate_owners(&owners(3), 0),
            Err(ValidationError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            validate_owners(&owners(11), 2),
            Err(ValidationError::TooManyOwners { max: 10, count: 11 })
        ));
        let mut dup = owners(2);
        dup[1].address = dup[0].address;
        assert_eq!(
            validate_owners(&dup, 1),
            Err(ValidationError::DuplicateOwner(dup[0].address))
        );
        let mut default = owners(2);
        default[0].address = Pubkey::default();
        assert_eq!(validate_owners(&default, 1), Err(ValidationError::DefaultOwner));
        let mut long = owners(1);
        long[0].name = "n".repeat(33);
        assert!(matches!(
            validate_owners(&long, 1),
            Err(ValidationError::FieldTooLong { field: "owner name", .. })
        ));
    }

    #[test]
    fn test_params_label() {
        let params = MultisigParams {
            label: "l".repeat(33),
            threshold: 1,
            owners: owners(1),
            cool_off_period_in_seconds: 0,
        };
        assert!(matches!(
            params.validate(),
            Err(ValidationError::FieldTooLong { field: "label", .. })
        ));
    }

    #[test]
    fn test_info_from_v2() {
        let program_id = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        let set = owners(3);
        let (_, nonce) = derive_authority(&program_id, &address);
        let ms = MultisigV2 {
            owners: owner_slots(&set).unwrap(),
            version: 2,
            nonce,
            label: pack_str("label", "ops").unwrap(),
            threshold: 2,
            ..Default::default()
        };
        let info = MultisigInfo::from_account(&program_id, address, &MultisigAccount::V2(ms));
        assert_eq!(info.owners, set);
        assert_eq!(info.label, "ops");
        assert_eq!(info.policy().live_owner_count, 3);
        assert!(info.check_invariants(&program_id).is_ok());
        assert!(info.is_owner(&set[1].address));

        let mut broken = info.clone();
        broken.nonce = nonce.wrapping_add(1);
        assert!(broken.check_invariants(&program_id).is_err());
        let mut broken = info;
        broken.threshold = 4;
        assert!(broken.check_invariants(&program_id).is_err());
    }
}
