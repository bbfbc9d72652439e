//! decoding of spl token instructions through the ledger's json instruction parser
use {
    super::{arg, DecodedInstruction, InstructionArg, InstructionDecoder, LabeledAccount},
    serde::Deserialize,
    serde_json::{Map, Value},
    solana_sdk::{instruction::CompiledInstruction, message::AccountKeys, pubkey::Pubkey},
    solana_transaction_status::parse_instruction::parse,
};

pub const TOKEN_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const TOKEN_2022_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// the `{type, info}` shape every parsed token instruction shares
#[derive(Deserialize)]
struct PartiallyDecodedInstruction {
    #[serde(alias = "type")]
    type_: String,
    #[serde(default)]
    info: Map<String, Value>,
}

fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// labels each account with the info field naming it, unnamed accounts use "signer"
fn label_accounts(info: &Map<String, Value>, accounts: &[Pubkey]) -> Vec<LabeledAccount> {
    accounts
        .iter()
        .map(|key| {
            let address = key.to_string();
            let label = info
                .iter()
                .find(|(_, value)| value.as_str() == Some(address.as_str()))
                .map(|(label, _)| label.clone())
                .unwrap_or_else(|| "signer".to_string());
            LabeledAccount { label, address }
        })
        .collect()
}

/// info fields that are not accounts, nested amounts are flattened as `parent.field`
fn info_args(info: &Map<String, Value>, accounts: &[Pubkey]) -> Vec<InstructionArg> {
    let is_account = |value: &Value| {
        value
            .as_str()
            .is_some_and(|s| accounts.iter().any(|key| key.to_string() == s))
    };
    let mut args = Vec::new();
    for (label, value) in info {
        match value {
            Value::Object(nested) => args.extend(
                nested
                    .iter()
                    .map(|(field, v)| arg(&format!("{label}.{field}"), value_string(v))),
            ),
            // multisig signer lists are already reported as accounts
            Value::Array(_) => {}
            v if is_account(v) => {}
            v => args.push(arg(label, value_string(v))),
        }
    }
    args
}

/// handles both the legacy token program and token-2022, which share the base tags
pub struct TokenDecoder {
    pub program_id: Pubkey,
}

impl InstructionDecoder for TokenDecoder {
    fn program_name(&self) -> &'static str {
        if self.program_id == TOKEN_2022_PROGRAM_ID {
            "Token-2022 Program"
        } else {
            "Token Program"
        }
    }

    fn decode(&self, accounts: &[Pubkey], data: &[u8]) -> Option<DecodedInstruction> {
        let program_id_index = u8::try_from(accounts.len()).ok()?;
        let mut keys = accounts.to_vec();
        keys.push(self.program_id);
        let compiled = CompiledInstruction {
            program_id_index,
            accounts: (0..program_id_index).collect(),
            data: data.to_vec(),
        };
        let parsed = match parse(&self.program_id, &compiled, &AccountKeys::new(&keys, None), None) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::debug!("unparsable {} instruction: {err}", self.program_name());
                return None;
            }
        };
        let partially_decoded = PartiallyDecodedInstruction::deserialize(&parsed.parsed).ok()?;
        Some(DecodedInstruction {
            program_id: self.program_id,
            program_name: self.program_name().to_string(),
            accounts: label_accounts(&partially_decoded.info, accounts),
            args: info_args(&partially_decoded.info, accounts),
            name: partially_decoded.type_,
        })
    }
}
