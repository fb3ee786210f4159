use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{next_seq, Database, DatabaseError};
use super::models::{Subscriber, SubscriptionLink};
use super::tables::*;

/// Result of a redemption attempt. Rejections leave no trace in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Granted { alias: String, newly_created: bool },
    AlreadySubscribed,
    InvalidOrUsed,
}

impl Database {
    /// Persist a freshly issued, unconsumed link.
    pub fn insert_link(&self, link: &SubscriptionLink) -> Result<(), DatabaseError> {
        debug_assert!(!link.token.is_empty(), "link token must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(LINKS)?;
            let data = rmp_serde::to_vec_named(link)?;
            table.insert(link.token.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a link by its token.
    pub fn get_link(&self, token: &str) -> Result<Option<SubscriptionLink>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LINKS)?;
        match table.get(token)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Redeem a link for a principal. Link lookup, the rejection checks,
    /// the subscriber upsert, and link consumption all happen inside one
    /// write transaction; rejection paths abort it, so a consumed link
    /// without a subscriber (or vice versa) cannot be observed.
    ///
    /// `alias_candidate` is only used when the redemption creates a new
    /// subscriber; an existing subscriber keeps its original alias.
    pub fn redeem_link(
        &self,
        token: &str,
        principal: i64,
        display_name: &str,
        alias_candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, DatabaseError> {
        let write_txn = self.begin_write()?;

        let outcome = {
            let mut links = write_txn.open_table(LINKS)?;
            let link: Option<SubscriptionLink> = match links.get(token)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            match link {
                None => {
                    tracing::debug!(token, "redemption rejected: unknown token");
                    RedeemOutcome::InvalidOrUsed
                }
                Some(link) if link.consumed => {
                    tracing::debug!(token, "redemption rejected: token already consumed");
                    RedeemOutcome::InvalidOrUsed
                }
                Some(mut link) => {
                    let indexed_seq = {
                        let index = write_txn.open_table(SUBSCRIBER_INDEX)?;
                        let seq = index.get(principal)?.map(|v| v.value());
                        seq
                    };

                    let mut subscribers = write_txn.open_table(SUBSCRIBERS)?;
                    let existing: Option<(u64, Subscriber)> = match indexed_seq {
                        Some(seq) => match subscribers.get(seq)? {
                            Some(data) => Some((seq, rmp_serde::from_slice(data.value())?)),
                            None => None,
                        },
                        None => None,
                    };

                    if matches!(existing, Some((_, ref sub)) if sub.has_access) {
                        tracing::debug!(principal, "redemption rejected: already subscribed");
                        RedeemOutcome::AlreadySubscribed
                    } else {
                        let (seq, sub, newly_created) = match existing {
                            Some((seq, mut sub)) => {
                                // Re-grant: refresh the subscription, keep the alias.
                                sub.has_access = true;
                                sub.subscribed_at = Some(now);
                                sub.pending_file = true;
                                if !display_name.is_empty() {
                                    sub.display_name = display_name.to_string();
                                }
                                (seq, sub, false)
                            }
                            None => {
                                let sub = Subscriber {
                                    principal,
                                    display_name: display_name.to_string(),
                                    has_access: true,
                                    subscribed_at: Some(now),
                                    alias: alias_candidate.to_string(),
                                    files_received: 0,
                                    pending_file: true,
                                    last_file_sent: None,
                                };
                                (next_seq(&subscribers)?, sub, true)
                            }
                        };

                        let data = rmp_serde::to_vec_named(&sub)?;
                        subscribers.insert(seq, data.as_slice())?;
                        if newly_created {
                            let mut index = write_txn.open_table(SUBSCRIBER_INDEX)?;
                            index.insert(principal, seq)?;
                        }

                        link.consumed = true;
                        link.consumed_by = Some(principal);
                        link.consumed_at = Some(now);
                        let data = rmp_serde::to_vec_named(&link)?;
                        links.insert(token, data.as_slice())?;

                        RedeemOutcome::Granted {
                            alias: sub.alias,
                            newly_created,
                        }
                    }
                }
            }
        };

        match outcome {
            RedeemOutcome::Granted { .. } => write_txn.commit()?,
            _ => write_txn.abort()?,
        }
        Ok(outcome)
    }
}
