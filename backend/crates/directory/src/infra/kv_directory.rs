//! Store-backed Directory
//!
//! Each collection is one JSON array under one store key. Mutations read
//! the array with its revision, apply the change in memory, and write it
//! back conditionally on that revision. A conflicting write means another
//! request got in between, so the whole read-apply-write is repeated.

use std::sync::Arc;

use kernel::id::UserId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::config::DirectoryConfig;
use crate::domain::location::{Location, LocationPatch, Occupant, Presence};
use crate::domain::repository::{LocationDirectory, UserDirectory};
use crate::domain::user::{User, UserPatch, normalize_email};
use crate::error::{DirectoryError, DirectoryResult};
use crate::infra::store::{LOCATIONS_COLLECTION, RecordStore, USERS_COLLECTION};

/// Collection contents and the revision they were read at
struct Snapshot<T> {
    revision: Option<u64>,
    records: Vec<T>,
}

/// Result of applying a change to a snapshot
enum Mutation<R> {
    /// Write the modified records back, then return `R`
    Write(R),
    /// Nothing changed; return `R` without writing
    Skip(R),
}

pub struct KvDirectory<S> {
    store: Arc<S>,
    config: DirectoryConfig,
}

impl<S> Clone for KvDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S> KvDirectory<S>
where
    S: RecordStore + Sync,
{
    pub fn new(store: Arc<S>, config: DirectoryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load<T: DeserializeOwned>(&self, key: &'static str) -> DirectoryResult<Snapshot<T>> {
        match self.store.get(key).await? {
            None => Ok(Snapshot {
                revision: None,
                records: Vec::new(),
            }),
            Some(blob) if blob.payload.is_empty() => Ok(Snapshot {
                revision: Some(blob.revision),
                records: Vec::new(),
            }),
            Some(blob) => Ok(Snapshot {
                revision: Some(blob.revision),
                records: serde_json::from_slice(&blob.payload)?,
            }),
        }
    }

    /// Optimistic read-modify-write of one collection
    async fn mutate<T, R, F>(&self, key: &'static str, mut apply: F) -> DirectoryResult<R>
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
        F: FnMut(&mut Vec<T>) -> DirectoryResult<Mutation<R>> + Send,
    {
        let attempts = self.config.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let Snapshot {
                revision,
                mut records,
            } = self.load::<T>(key).await?;

            let output = match apply(&mut records)? {
                Mutation::Skip(output) => return Ok(output),
                Mutation::Write(output) => output,
            };

            let payload = serde_json::to_vec(&records)?;
            match self.store.put(key, payload, revision).await {
                Ok(new_revision) => {
                    tracing::debug!(
                        collection = key,
                        revision = new_revision,
                        records = records.len(),
                        "Collection written"
                    );
                    return Ok(output);
                }
                Err(e) if e.is_conflict() => {
                    tracing::debug!(collection = key, attempt, "Collection changed underneath; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DirectoryError::Contention {
            collection: key,
            attempts,
        })
    }
}

impl<S> UserDirectory for KvDirectory<S>
where
    S: RecordStore + Send + Sync,
{
    async fn list_users(&self) -> DirectoryResult<Vec<User>> {
        Ok(self.load::<User>(USERS_COLLECTION).await?.records)
    }

    async fn find_user_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.load::<User>(USERS_COLLECTION).await?.records;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn find_user_by_id(&self, id: &UserId) -> DirectoryResult<Option<User>> {
        let users = self.load::<User>(USERS_COLLECTION).await?.records;
        Ok(users.into_iter().find(|u| &u.id == id))
    }

    async fn create_user(&self, user: User) -> DirectoryResult<User> {
        let mut user = user;
        user.email = normalize_email(&user.email);

        let created = self
            .mutate(USERS_COLLECTION, |users: &mut Vec<User>| {
                // Re-checked on every attempt: a concurrent registration may have landed
                if users.iter().any(|u| u.email == user.email) {
                    return Err(DirectoryError::EmailTaken);
                }
                users.push(user.clone());
                Ok(Mutation::Write(user.clone()))
            })
            .await?;

        tracing::info!(user_id = %created.id, "User record created");
        Ok(created)
    }

    async fn update_user(&self, id: &UserId, patch: UserPatch) -> DirectoryResult<Option<User>> {
        if patch.is_empty() {
            return self.find_user_by_id(id).await;
        }

        self.mutate(USERS_COLLECTION, |users: &mut Vec<User>| {
            let Some(index) = users.iter().position(|u| &u.id == id) else {
                return Ok(Mutation::Skip(None));
            };

            if let Some(email) = &patch.email {
                let email = normalize_email(email);
                if users.iter().any(|u| &u.id != id && u.email == email) {
                    return Err(DirectoryError::EmailTaken);
                }
            }

            users[index].apply(patch.clone());
            Ok(Mutation::Write(Some(users[index].clone())))
        })
        .await
    }
}

impl<S> LocationDirectory for KvDirectory<S>
where
    S: RecordStore + Send + Sync,
{
    async fn list_locations(&self) -> DirectoryResult<Vec<Location>> {
        Ok(self.load::<Location>(LOCATIONS_COLLECTION).await?.records)
    }

    async fn find_location(&self, id: &str) -> DirectoryResult<Option<Location>> {
        let locations = self.load::<Location>(LOCATIONS_COLLECTION).await?.records;
        Ok(locations.into_iter().find(|l| l.id == id))
    }

    async fn add_location(&self, location: Location) -> DirectoryResult<Location> {
        let mut location = location;
        if location.id.trim().is_empty() {
            location.id = uuid::Uuid::new_v4().to_string();
        }
        location.vacate();
        location.validate()?;

        self.mutate(LOCATIONS_COLLECTION, |locations: &mut Vec<Location>| {
            if locations.iter().any(|l| l.id == location.id) {
                return Err(DirectoryError::LocationExists(location.id.clone()));
            }
            locations.push(location.clone());
            Ok(Mutation::Write(location.clone()))
        })
        .await
    }

    async fn update_location(
        &self,
        id: &str,
        patch: LocationPatch,
    ) -> DirectoryResult<Option<Location>> {
        if let Some(coordinates) = &patch.coordinates {
            coordinates.validate()?;
        }

        self.mutate(LOCATIONS_COLLECTION, |locations: &mut Vec<Location>| {
            let Some(location) = locations.iter_mut().find(|l| l.id == id) else {
                return Ok(Mutation::Skip(None));
            };
            location.apply(patch.clone());
            location.validate()?;
            Ok(Mutation::Write(Some(location.clone())))
        })
        .await
    }

    async fn check_in(&self, location_id: &str, presence: Presence) -> DirectoryResult<Location> {
        let occupant = Occupant::from(presence);
        let Some(user_id) = occupant.user_id else {
            return Err(DirectoryError::Validation(
                "Check-in requires a user".to_string(),
            ));
        };

        let location = self
            .mutate(LOCATIONS_COLLECTION, |locations: &mut Vec<Location>| {
                if !locations.iter().any(|l| l.id == location_id) {
                    return Err(DirectoryError::LocationNotFound);
                }
                for location in locations.iter_mut() {
                    location.remove_occupant(&user_id);
                }
                let mut checked_in = None;
                for location in locations.iter_mut().filter(|l| l.id == location_id) {
                    location.push_occupant(occupant.clone());
                    checked_in = Some(location.clone());
                }
                checked_in
                    .map(Mutation::Write)
                    .ok_or(DirectoryError::LocationNotFound)
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            location_id,
            intent = ?occupant.intent,
            "Checked in"
        );
        Ok(location)
    }

    async fn check_out(&self, user_id: &UserId) -> DirectoryResult<usize> {
        let left = self
            .mutate(LOCATIONS_COLLECTION, |locations: &mut Vec<Location>| {
                let left = locations
                    .iter_mut()
                    .map(|l| l.remove_occupant(user_id))
                    .filter(|removed| *removed)
                    .count();
                Ok(if left == 0 {
                    Mutation::Skip(0)
                } else {
                    Mutation::Write(left)
                })
            })
            .await?;

        if left > 0 {
            tracing::info!(user_id = %user_id, locations = left, "Checked out");
        }
        Ok(left)
    }
}
