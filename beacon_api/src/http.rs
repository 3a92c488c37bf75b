use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::try_join;
use itertools::Itertools as _;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use types::{
    assignments::{CommitteeDuty, ValidatorDuty, WireAssignments},
    clock,
    config::ChainConfig,
    containers::{Balances, Block, BlockStatus, ChainHead, Validator},
    primitives::{Epoch, Slot, ValidatorIndex},
    redacting_url::RedactingUrl,
};

use crate::{
    api::BeaconNodeApi,
    error::Error,
    responses::{
        BlockBody, BlockHeader, BlockMessage, Committee, DataEnvelope, FinalityCheckpoints,
        NodeVersion, ProposerDuty, SignedBlock, ValidatorBalance, ValidatorEntry, ValidatorRecord,
    },
};

/// Maximum number of duty records in one page of [`WireAssignments`].
pub const PAGE_SIZE: usize = 200_000;

/// Days before the requested epoch whose balances are recorded with every validator.
const BALANCE_HISTORY_DAYS: [u64; 3] = [1, 7, 31];

/// Client for the standard Eth Beacon Node API.
pub struct HttpBeaconNode {
    client: Client,
    url: RedactingUrl,
    chain_config: ChainConfig,
}

#[async_trait]
impl BeaconNodeApi for HttpBeaconNode {
    fn url(&self) -> &RedactingUrl {
        &self.url
    }

    async fn node_version(&self) -> Result<String> {
        let NodeVersion { version } = self.get("/eth/v1/node/version").await?;
        Ok(version)
    }

    async fn chain_head(&self) -> Result<ChainHead> {
        let (head, checkpoints) = try_join!(
            self.get::<BlockHeader>("/eth/v1/beacon/headers/head"),
            self.get::<FinalityCheckpoints>("/eth/v1/beacon/states/head/finality_checkpoints"),
        )?;

        let FinalityCheckpoints {
            previous_justified,
            current_justified,
            finalized,
        } = checkpoints;

        let config = &self.chain_config;
        let head_slot = head.header.message.slot;

        Ok(ChainHead {
            head_slot,
            head_epoch: clock::epoch_at_slot(config, head_slot),
            head_block_root: head.root,
            finalized_slot: clock::start_slot_of_epoch(config, finalized.epoch),
            finalized_epoch: finalized.epoch,
            finalized_block_root: finalized.root,
            justified_slot: clock::start_slot_of_epoch(config, current_justified.epoch),
            justified_epoch: current_justified.epoch,
            justified_block_root: current_justified.root,
            previous_justified_slot: clock::start_slot_of_epoch(config, previous_justified.epoch),
            previous_justified_epoch: previous_justified.epoch,
            previous_justified_block_root: previous_justified.root,
        })
    }

    async fn epoch_assignments(&self, epoch: Epoch) -> Result<Vec<WireAssignments>> {
        let state_id = self.state_id(epoch);
        let proposers_path = format!("/eth/v1/validator/duties/proposer/{epoch}");
        let committees_path = format!("/eth/v1/beacon/states/{state_id}/committees?epoch={epoch}");

        let (proposer_duties, committees) = try_join!(
            self.get::<Vec<ProposerDuty>>(&proposers_path),
            self.get::<Vec<Committee>>(&committees_path),
        )?;

        let attester_duties = committees.iter().flat_map(|committee| {
            committee
                .validators
                .iter()
                .map(|validator_index| ValidatorDuty {
                    validator_index: *validator_index,
                    attestation: Some(CommitteeDuty {
                        attester_slot: committee.slot,
                        committee_index: committee.index,
                        committee: Arc::clone(&committee.validators),
                    }),
                    proposer_slots: vec![],
                })
        });

        let proposer_duties = proposer_duties.into_iter().map(
            |ProposerDuty {
                 validator_index,
                 slot,
             }| ValidatorDuty {
                validator_index,
                attestation: None,
                proposer_slots: vec![slot],
            },
        );

        paginate(epoch, attester_duties.chain(proposer_duties).collect())
    }

    async fn balances_for_epoch(&self, epoch: Epoch) -> Result<Balances> {
        let state_id = self.state_id(epoch);

        let balances = self
            .get::<Vec<ValidatorBalance>>(&format!(
                "/eth/v1/beacon/states/{state_id}/validator_balances",
            ))
            .await?
            .into_iter()
            .map(|ValidatorBalance { index, balance }| (index, balance))
            .collect();

        Ok(balances)
    }

    async fn epoch_validators(&self, epoch: Epoch) -> Result<Vec<Validator>> {
        let state_id = self.state_id(epoch);
        let validators_path = format!("/eth/v1/beacon/states/{state_id}/validators");
        let [one_day, seven_days, thirty_one_days] = BALANCE_HISTORY_DAYS;

        let (entries, balances_1d, balances_7d, balances_31d) = try_join!(
            self.get::<Vec<ValidatorEntry>>(&validators_path),
            self.balances_days_before(epoch, one_day),
            self.balances_days_before(epoch, seven_days),
            self.balances_days_before(epoch, thirty_one_days),
        )?;

        let balance_of = |balances: &Balances, index: ValidatorIndex| {
            balances.get(&index).copied().unwrap_or_default()
        };

        let validators = entries
            .into_iter()
            .map(|entry| {
                let ValidatorEntry {
                    index,
                    balance,
                    validator,
                } = entry;

                let ValidatorRecord {
                    pubkey,
                    withdrawal_credentials,
                    effective_balance,
                    slashed,
                    activation_eligibility_epoch,
                    activation_epoch,
                    exit_epoch,
                    withdrawable_epoch,
                } = validator;

                Validator {
                    index,
                    public_key: pubkey,
                    balance,
                    effective_balance,
                    slashed,
                    activation_eligibility_epoch,
                    activation_epoch,
                    exit_epoch,
                    withdrawable_epoch,
                    withdrawal_credentials,
                    // The standard API has no way to look this up.
                    balance_activation: 0,
                    balance_1d: balance_of(&balances_1d, index),
                    balance_7d: balance_of(&balances_7d, index),
                    balance_31d: balance_of(&balances_31d, index),
                }
            })
            .collect();

        Ok(validators)
    }

    async fn blocks_by_slot(&self, slot: Slot) -> Result<Vec<Block>> {
        let headers = self
            .get::<Vec<BlockHeader>>(&format!("/eth/v1/beacon/headers?slot={slot}"))
            .await?;

        let mut blocks = Vec::with_capacity(headers.len());

        for BlockHeader {
            root,
            canonical,
            header,
        } in headers
        {
            // Orphaned blocks may be pruned between the two requests.
            let Some(SignedBlock { message, signature }) = self
                .get_optional(&format!("/eth/v2/beacon/blocks/{root:#x}"))
                .await?
            else {
                debug!("block {root:#x} at slot {slot} disappeared from {}", self.url);
                continue;
            };

            let BlockMessage {
                slot,
                proposer_index,
                parent_root,
                state_root,
                body,
            } = message;

            let BlockBody {
                randao_reveal,
                eth1_data,
                graffiti,
                proposer_slashings,
                attester_slashings,
                attestations,
                deposits,
                voluntary_exits,
            } = body;

            let status = if canonical {
                BlockStatus::Proposed
            } else {
                BlockStatus::Orphaned
            };

            blocks.push(Block {
                status,
                proposer: proposer_index,
                block_root: root,
                slot,
                parent_root,
                state_root,
                signature,
                randao_reveal,
                graffiti,
                eth1_data,
                body_root: header.message.body_root,
                proposer_slashings,
                attester_slashings,
                attestations,
                deposits,
                voluntary_exits: voluntary_exits
                    .into_iter()
                    .map(|signed_exit| signed_exit.message)
                    .collect(),
                canonical,
            });
        }

        Ok(blocks)
    }
}

impl HttpBeaconNode {
    #[must_use]
    pub const fn new(client: Client, url: RedactingUrl, chain_config: ChainConfig) -> Self {
        Self {
            client,
            url,
            chain_config,
        }
    }

    // The state at the first slot of an epoch. Nodes resolve it to the latest earlier block if
    // the slot itself is empty.
    const fn state_id(&self, epoch: Epoch) -> Slot {
        clock::start_slot_of_epoch(&self.chain_config, epoch)
    }

    async fn balances_days_before(&self, epoch: Epoch, days: u64) -> Result<Balances> {
        let distance = clock::epochs_per_day(&self.chain_config).saturating_mul(days);

        match epoch.checked_sub(distance) {
            Some(past_epoch) => self.balances_for_epoch(past_epoch).await,
            None => Ok(Balances::new()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send_get(path).await?;
        let response = handle_error(response).await?;
        let DataEnvelope { data } = response.json().await?;
        Ok(data)
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.send_get(path).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = handle_error(response).await?;
        let DataEnvelope { data } = response.json().await?;
        Ok(Some(data))
    }

    async fn send_get(&self, path: &str) -> Result<Response> {
        let url = self.url.join(path)?;

        debug!("GET {url}");

        self.client
            .get(url.into_url())
            .send()
            .await
            .map_err(Into::into)
    }
}

fn paginate(epoch: Epoch, duties: Vec<ValidatorDuty>) -> Result<Vec<WireAssignments>> {
    let total_size = u64::try_from(duties.len())?;

    let chunks = duties.into_iter().chunks(PAGE_SIZE);
    let mut pages = chunks
        .into_iter()
        .zip(1_usize..)
        .map(|(chunk, next_page)| WireAssignments {
            epoch,
            duties: chunk.collect(),
            next_page_token: next_page.to_string(),
            total_size,
        })
        .collect_vec();

    if let Some(last_page) = pages.last_mut() {
        last_page.next_page_token.clear();
    }

    Ok(pages)
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(Error::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(Error::NodeInternalError { message });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};
    use serde_json::{json, Value};
    use types::primitives::{PublicKeyBytes, H256};

    use super::*;

    fn node(server: &MockServer) -> Result<HttpBeaconNode> {
        Ok(HttpBeaconNode::new(
            Client::new(),
            server.base_url().parse()?,
            ChainConfig::mainnet(),
        ))
    }

    fn hex(byte: u8, length: usize) -> String {
        format!("0x{}", format!("{byte:02x}").repeat(length))
    }

    fn respond(server: &MockServer, path: &str, data: Value) {
        server.mock(|when, then| {
            when.method(Method::GET).path(path);
            then.status(200).json_body(json!({ "data": data }));
        });
    }

    #[tokio::test]
    async fn node_version_is_read_from_data() -> Result<()> {
        let server = MockServer::start();

        respond(
            &server,
            "/eth/v1/node/version",
            json!({ "version": "Grandine/v1.0.0" }),
        );

        assert_eq!(node(&server)?.node_version().await?, "Grandine/v1.0.0");

        Ok(())
    }

    #[tokio::test]
    async fn chain_head_combines_header_and_checkpoints() -> Result<()> {
        let server = MockServer::start();

        respond(
            &server,
            "/eth/v1/beacon/headers/head",
            json!({
                "root": hex(1, 32),
                "canonical": true,
                "header": {
                    "message": {
                        "slot": "3210",
                        "proposer_index": "5",
                        "parent_root": hex(0, 32),
                        "state_root": hex(0, 32),
                        "body_root": hex(0, 32),
                    },
                    "signature": hex(0, 96),
                },
            }),
        );

        respond(
            &server,
            "/eth/v1/beacon/states/head/finality_checkpoints",
            json!({
                "previous_justified": { "epoch": "98", "root": hex(2, 32) },
                "current_justified": { "epoch": "99", "root": hex(3, 32) },
                "finalized": { "epoch": "97", "root": hex(4, 32) },
            }),
        );

        let head = node(&server)?.chain_head().await?;

        assert_eq!(head.head_slot, 3210);
        assert_eq!(head.head_epoch, 100);
        assert_eq!(head.head_block_root, H256::repeat_byte(1));
        assert_eq!(head.finalized_epoch, 97);
        assert_eq!(head.finalized_slot, 97 * 32);
        assert_eq!(head.justified_epoch, 99);
        assert_eq!(head.justified_block_root, H256::repeat_byte(3));
        assert_eq!(head.previous_justified_slot, 98 * 32);

        Ok(())
    }

    #[tokio::test]
    async fn epoch_assignments_share_committees_between_duties() -> Result<()> {
        let server = MockServer::start();

        respond(
            &server,
            "/eth/v1/validator/duties/proposer/100",
            json!([
                { "pubkey": hex(0, 48), "validator_index": "7", "slot": "3200" },
                { "pubkey": hex(0, 48), "validator_index": "8", "slot": "3201" },
            ]),
        );

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/beacon/states/3200/committees")
                .query_param("epoch", "100");
            then.status(200).json_body(json!({
                "execution_optimistic": false,
                "finalized": true,
                "data": [
                    { "index": "0", "slot": "3200", "validators": ["42", "43"] },
                    { "index": "0", "slot": "3201", "validators": ["99"] },
                ],
            }));
        });

        let pages = node(&server)?.epoch_assignments(100).await?;

        assert_eq!(pages.len(), 1);

        let page = &pages[0];

        assert_eq!(page.epoch, 100);
        assert_eq!(page.total_size, 5);
        assert_eq!(page.next_page_token, "");

        let committees = page
            .duties
            .iter()
            .filter_map(|duty| duty.attestation.as_ref())
            .collect_vec();

        assert_eq!(committees.len(), 3);
        assert!(Arc::ptr_eq(&committees[0].committee, &committees[1].committee));
        assert_eq!(&*committees[2].committee, [99]);

        let proposer_slots = page
            .duties
            .iter()
            .flat_map(|duty| duty.proposer_slots.iter().map(|slot| (duty.validator_index, *slot)))
            .collect_vec();

        assert_eq!(proposer_slots, [(7, 3200), (8, 3201)]);

        Ok(())
    }

    #[test]
    fn duties_are_split_into_pages() -> Result<()> {
        let duties = vec![ValidatorDuty::default(); PAGE_SIZE * 2 + 1];

        let pages = paginate(5, duties)?;

        assert_eq!(
            pages
                .iter()
                .map(|page| (page.duties.len(), page.next_page_token.as_str()))
                .collect_vec(),
            [(PAGE_SIZE, "1"), (PAGE_SIZE, "2"), (1, "")],
        );

        assert!(pages.iter().all(|page| page.total_size == 400_001));

        Ok(())
    }

    #[test]
    fn no_duties_produce_no_pages() -> Result<()> {
        assert_eq!(paginate(5, vec![])?, []);
        Ok(())
    }

    #[tokio::test]
    async fn balances_accept_strings_and_numbers() -> Result<()> {
        let server = MockServer::start();

        respond(
            &server,
            "/eth/v1/beacon/states/64/validator_balances",
            json!([
                { "index": "0", "balance": "32000000000" },
                { "index": 1, "balance": 31_000_000_000_u64 },
            ]),
        );

        let balances = node(&server)?.balances_for_epoch(2).await?;

        assert_eq!(
            balances,
            Balances::from([(0, 32_000_000_000), (1, 31_000_000_000)]),
        );

        Ok(())
    }

    #[tokio::test]
    async fn validators_include_historical_balances() -> Result<()> {
        let server = MockServer::start();
        let epoch = 7000;

        respond(
            &server,
            &format!("/eth/v1/beacon/states/{}/validators", epoch * 32),
            json!([{
                "index": "3",
                "balance": "32000000001",
                "status": "active_ongoing",
                "validator": {
                    "pubkey": hex(0xab, 48),
                    "withdrawal_credentials": hex(1, 32),
                    "effective_balance": "32000000000",
                    "slashed": false,
                    "activation_eligibility_epoch": "0",
                    "activation_epoch": "0",
                    "exit_epoch": "18446744073709551615",
                    "withdrawable_epoch": "18446744073709551615",
                },
            }]),
        );

        for (days_ago, balance) in [(1, "31000000000"), (7, "30000000000"), (31, "29000000000")] {
            let past_slot = (epoch - 225 * days_ago) * 32;

            respond(
                &server,
                &format!("/eth/v1/beacon/states/{past_slot}/validator_balances"),
                json!([{ "index": "3", "balance": balance }]),
            );
        }

        let validators = node(&server)?.epoch_validators(epoch).await?;

        assert_eq!(
            validators,
            [Validator {
                index: 3,
                public_key: PublicKeyBytes([0xab; 48]),
                balance: 32_000_000_001,
                effective_balance: 32_000_000_000,
                slashed: false,
                activation_eligibility_epoch: 0,
                activation_epoch: 0,
                exit_epoch: u64::MAX,
                withdrawable_epoch: u64::MAX,
                withdrawal_credentials: H256::repeat_byte(1),
                balance_activation: 0,
                balance_1d: 31_000_000_000,
                balance_7d: 30_000_000_000,
                balance_31d: 29_000_000_000,
            }],
        );

        Ok(())
    }

    #[tokio::test]
    async fn history_before_genesis_is_zero() -> Result<()> {
        let server = MockServer::start();

        respond(
            &server,
            "/eth/v1/beacon/states/7200/validator_balances",
            json!([{ "index": "0", "balance": "1" }]),
        );

        respond(
            &server,
            "/eth/v1/beacon/states/14400/validators",
            json!([{
                "index": "0",
                "balance": "5",
                "validator": {
                    "pubkey": hex(0, 48),
                    "withdrawal_credentials": hex(0, 32),
                    "effective_balance": "0",
                    "slashed": true,
                    "activation_eligibility_epoch": "0",
                    "activation_epoch": "0",
                    "exit_epoch": "1",
                    "withdrawable_epoch": "2",
                },
            }]),
        );

        let validators = node(&server)?.epoch_validators(450).await?;

        assert_eq!(validators.len(), 1);
        assert_eq!(validators[0].balance_1d, 1);
        assert_eq!(validators[0].balance_7d, 0);
        assert_eq!(validators[0].balance_31d, 0);

        Ok(())
    }

    #[tokio::test]
    async fn blocks_by_slot_include_orphans_and_skip_pruned_blocks() -> Result<()> {
        let server = MockServer::start();

        let header = |root: u8, canonical: bool| {
            json!({
                "root": hex(root, 32),
                "canonical": canonical,
                "header": {
                    "message": {
                        "slot": "3201",
                        "proposer_index": "9",
                        "parent_root": hex(0, 32),
                        "state_root": hex(0, 32),
                        "body_root": hex(root + 0x10, 32),
                    },
                    "signature": hex(0, 96),
                },
            })
        };

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/beacon/headers")
                .query_param("slot", "3201");
            then.status(200).json_body(json!({
                "data": [header(1, true), header(2, false), header(3, false)],
            }));
        });

        for root in [1, 2] {
            respond(
                &server,
                &format!("/eth/v2/beacon/blocks/{}", hex(root, 32)),
                json!({
                    "message": {
                        "slot": "3201",
                        "proposer_index": "9",
                        "parent_root": hex(0, 32),
                        "state_root": hex(5, 32),
                        "body": {
                            "randao_reveal": hex(0, 96),
                            "eth1_data": {
                                "deposit_root": hex(0, 32),
                                "deposit_count": "10",
                                "block_hash": hex(0, 32),
                            },
                            "graffiti": hex(0x67, 32),
                            "proposer_slashings": [],
                            "attester_slashings": [],
                            "attestations": [],
                            "deposits": [],
                            "voluntary_exits": [{
                                "message": { "epoch": "100", "validator_index": "4" },
                                "signature": hex(0, 96),
                            }],
                            "sync_aggregate": {},
                        },
                    },
                    "signature": hex(0, 96),
                }),
            );
        }

        server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/eth/v2/beacon/blocks/{}", hex(3, 32)));
            then.status(404).body(r#"{"code":404,"message":"block not found"}"#);
        });

        let blocks = node(&server)?.blocks_by_slot(3201).await?;

        assert_eq!(
            blocks
                .iter()
                .map(|block| (block.block_root, block.status, block.canonical))
                .collect_vec(),
            [
                (H256::repeat_byte(1), BlockStatus::Proposed, true),
                (H256::repeat_byte(2), BlockStatus::Orphaned, false),
            ],
        );

        let block = &blocks[0];

        assert_eq!(block.proposer, 9);
        assert_eq!(block.body_root, H256::repeat_byte(0x11));
        assert_eq!(block.eth1_data.deposit_count, 10);
        assert_eq!(block.graffiti, H256::repeat_byte(0x67));
        assert_eq!(block.voluntary_exits[0].validator_index, 4);

        Ok(())
    }

    #[tokio::test]
    async fn missed_slot_has_no_blocks() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/beacon/headers")
                .query_param("slot", "77");
            then.status(200).json_body(json!({ "data": [] }));
        });

        assert_eq!(node(&server)?.blocks_by_slot(77).await?, []);

        Ok(())
    }

    #[tokio::test]
    async fn error_statuses_are_reported() -> Result<()> {
        let cases = [
            (400, Error::BadRequest { message: "invalid epoch".to_owned() }),
            (404, Error::BadRequest { message: "invalid epoch".to_owned() }),
            (500, Error::NodeInternalError { message: "invalid epoch".to_owned() }),
            (503, Error::NodeInternalError { message: "invalid epoch".to_owned() }),
        ];

        for (status, expected) in cases {
            let server = MockServer::start();

            server.mock(|when, then| {
                when.method(Method::GET);
                then.status(status).body("invalid epoch");
            });

            let error = node(&server)?
                .balances_for_epoch(1)
                .await
                .expect_err("error status should be reported")
                .downcast::<Error>()?;

            assert_eq!(error, expected);
        }

        Ok(())
    }
}
