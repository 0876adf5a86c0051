//! Kanban boards for staged records (deals, tasks).
//!
//! A stage move is applied to the local board first and then confirmed
//! with the server. When the server refuses it the board is reloaded from
//! the server; if that reload fails too, the card goes back to the stage it
//! came from.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{api::CrmClient, error::ClientError};
use crate::models::Staged;

/// Server side of a board.
#[async_trait]
pub trait StageRemote<T: Staged>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<T>, ClientError>;
    async fn push_stage(&self, id: i32, stage: T::Stage) -> Result<T, ClientError>;
}

#[async_trait]
impl<T: Staged> StageRemote<T> for CrmClient {
    async fn fetch_all(&self) -> Result<Vec<T>, ClientError> {
        self.list::<T>().await
    }

    async fn push_stage(&self, id: i32, stage: T::Stage) -> Result<T, ClientError> {
        self.update::<T>(&id, &T::stage_patch(stage)).await
    }
}

#[derive(Debug)]
pub enum MoveOutcome {
    /// The card already sat in the requested stage.
    Unchanged,
    Confirmed,
    /// The server refused the move and the board was put back.
    Reverted { error: ClientError },
}

#[derive(Debug, Clone)]
pub struct Board<T: Staged> {
    cards: Vec<T>,
}

impl<T: Staged> Board<T> {
    pub fn new(cards: Vec<T>) -> Self {
        Self { cards }
    }

    pub async fn load(remote: &dyn StageRemote<T>) -> Result<Self, ClientError> {
        Ok(Self::new(remote.fetch_all().await?))
    }

    pub fn cards(&self) -> &[T] {
        &self.cards
    }

    pub fn card(&self, id: i32) -> Option<&T> {
        self.cards.iter().find(|c| c.id() == id)
    }

    pub fn column(&self, stage: T::Stage) -> Vec<&T> {
        self.cards.iter().filter(|c| c.stage() == stage).collect()
    }

    fn position(&self, id: i32) -> Option<usize> {
        self.cards.iter().position(|c| c.id() == id)
    }

    pub async fn move_card(
        &mut self,
        remote: &dyn StageRemote<T>,
        id: i32,
        stage: T::Stage,
    ) -> Result<MoveOutcome, ClientError> {
        let idx = self.position(id).ok_or(ClientError::UnknownCard(id))?;
        let previous = self.cards[idx].stage();
        if previous == stage {
            return Ok(MoveOutcome::Unchanged);
        }

        self.cards[idx].set_stage(stage);

        match remote.push_stage(id, stage).await {
            Ok(confirmed) => {
                if let Some(idx) = self.position(id) {
                    self.cards[idx] = confirmed;
                }
                info!(id, ?stage, "stage move confirmed");
                Ok(MoveOutcome::Confirmed)
            }
            Err(error) => {
                warn!(id, ?stage, error = %error, "stage move refused; reverting");
                match remote.fetch_all().await {
                    Ok(fresh) => self.cards = fresh,
                    Err(e) => {
                        warn!(error = %e, "reload failed; restoring previous stage");
                        if let Some(idx) = self.position(id) {
                            self.cards[idx].set_stage(previous);
                        }
                    }
                }
                Ok(MoveOutcome::Reverted { error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::StatusCode;

    use super::*;
    use crate::models::{Deal, DealStage};

    /// Server stand-in whose state can refuse pushes and reloads.
    struct FakeRemote {
        deals: Mutex<Vec<Deal>>,
        refuse_push: bool,
        refuse_fetch: bool,
    }

    impl FakeRemote {
        fn new(deals: Vec<Deal>) -> Self {
            Self {
                deals: Mutex::new(deals),
                refuse_push: false,
                refuse_fetch: false,
            }
        }

        fn refused() -> ClientError {
            ClientError::Api {
                status: StatusCode::BAD_REQUEST,
                message: "nope".into(),
            }
        }
    }

    #[async_trait]
    impl StageRemote<Deal> for FakeRemote {
        async fn fetch_all(&self) -> Result<Vec<Deal>, ClientError> {
            if self.refuse_fetch {
                return Err(Self::refused());
            }
            Ok(self.deals.lock().unwrap().clone())
        }

        async fn push_stage(&self, id: i32, stage: DealStage) -> Result<Deal, ClientError> {
            if self.refuse_push {
                return Err(Self::refused());
            }
            let mut deals = self.deals.lock().unwrap();
            let deal = deals.iter_mut().find(|d| d.id == id).unwrap();
            deal.stage = stage;
            Ok(deal.clone())
        }
    }

    fn deal(id: i32, stage: DealStage) -> Deal {
        Deal {
            id,
            title: format!("Deal {id}"),
            company: "Acme".into(),
            value: 100.0,
            stage,
        }
    }

    #[tokio::test]
    async fn confirmed_move_sticks() {
        let remote = FakeRemote::new(vec![deal(1, DealStage::Lead), deal(2, DealStage::Won)]);
        let mut board = Board::<Deal>::load(&remote).await.unwrap();

        let outcome = board.move_card(&remote, 1, DealStage::Proposal).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Confirmed));
        assert_eq!(board.card(1).unwrap().stage, DealStage::Proposal);
        assert_eq!(board.column(DealStage::Lead).len(), 0);
        assert_eq!(remote.deals.lock().unwrap()[0].stage, DealStage::Proposal);
    }

    #[tokio::test]
    async fn refused_move_leaves_board_equal_to_server() {
        let mut remote = FakeRemote::new(vec![deal(1, DealStage::Lead), deal(2, DealStage::Won)]);
        let mut board = Board::<Deal>::load(&remote).await.unwrap();

        // Someone else changed deal 2 meanwhile.
        remote.deals.lock().unwrap()[1].stage = DealStage::Closed;
        remote.refuse_push = true;

        let outcome = board.move_card(&remote, 1, DealStage::Won).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Reverted { .. }));
        assert_eq!(board.cards(), remote.deals.lock().unwrap().as_slice());
    }

    #[tokio::test]
    async fn failed_reload_restores_previous_stage() {
        let mut remote = FakeRemote::new(vec![deal(1, DealStage::Lead)]);
        let mut board = Board::<Deal>::load(&remote).await.unwrap();
        remote.refuse_push = true;
        remote.refuse_fetch = true;

        let outcome = board.move_card(&remote, 1, DealStage::Won).await.unwrap();
        match outcome {
            MoveOutcome::Reverted { error } => {
                assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(board.card(1).unwrap().stage, DealStage::Lead);
    }

    #[tokio::test]
    async fn same_stage_and_unknown_card() {
        let remote = FakeRemote::new(vec![deal(1, DealStage::Lead)]);
        let mut board = Board::<Deal>::load(&remote).await.unwrap();

        let outcome = board.move_card(&remote, 1, DealStage::Lead).await.unwrap();
        assert!(matches!(outcome, MoveOutcome::Unchanged));

        let err = board.move_card(&remote, 9, DealStage::Won).await.unwrap_err();
        assert!(matches!(err, ClientError::UnknownCard(9)));
    }
}
