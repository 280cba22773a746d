//! Folders and folder membership.
//!
//! Folders are always private: only the owner (or a moderator, for reads)
//! sees them. Filing a studyset needs ownership of the folder and read access
//! to the studyset at the time of the call; later visibility changes do not
//! touch existing memberships.

use tracing::{info, instrument};
use uuid::Uuid;

use super::validation::validate_folder_name;
use super::ContentService;
use crate::access::{
    can_read, ensure_can_read, ensure_can_write, missing, require_user, Identity,
};
use crate::cursor::{CursorKey, IdKey};
use crate::error::ServiceResult;
use crate::models::{Folder, Studyset};
use crate::pagination::{paginate_visible, Connection};

fn can_read_folder(identity: &Identity, folder: &Folder) -> bool {
    can_read(identity, folder.user_id, true)
}

impl ContentService {
    /// Fetch one folder; `None` when missing or not readable.
    #[instrument(skip(self))]
    pub async fn folder(&self, identity: &Identity, id: Uuid) -> ServiceResult<Option<Folder>> {
        let folder = self.repos.folders().get_folder(id).await?;
        Ok(folder.filter(|f| can_read_folder(identity, f)))
    }

    /// The requester's folders, in id order.
    #[instrument(skip(self))]
    pub async fn my_folders(
        &self,
        identity: &Identity,
        first: Option<i32>,
        after: Option<&str>,
    ) -> ServiceResult<Connection<Folder>> {
        let user_id = require_user(identity, "my_folders")?;
        let first = self.page_size(first)?;
        let after = IdKey::decode_or_start(after);
        let repo = self.repos.folders();

        let connection = paginate_visible(
            first,
            after,
            |id| async move {
                Ok(repo
                    .get_folder(id)
                    .await?
                    .is_some_and(|f| f.user_id == user_id))
            },
            |after, limit| async move {
                repo.list_folders_by_user(user_id, after.as_ref(), limit)
                    .await
            },
            |f: &Folder| can_read_folder(identity, f),
            Folder::id_key,
        )
        .await?;

        Ok(connection)
    }

    /// Studysets filed into a folder that the requester can read.
    pub async fn folder_studysets(
        &self,
        identity: &Identity,
        folder: &Folder,
    ) -> ServiceResult<Vec<Studyset>> {
        if !can_read_folder(identity, folder) {
            return Ok(Vec::new());
        }
        let studysets = self
            .repos
            .folders()
            .list_folder_studysets(folder.id)
            .await?;
        Ok(studysets
            .into_iter()
            .filter(|s| can_read(identity, s.user_id, s.private))
            .collect())
    }

    /// The folder the requester filed a studyset into, if any.
    pub async fn studyset_folder(
        &self,
        identity: &Identity,
        studyset: &Studyset,
    ) -> ServiceResult<Option<Folder>> {
        let Some(user_id) = identity.user_id() else {
            return Ok(None);
        };
        Ok(self
            .repos
            .folders()
            .get_studyset_folder(user_id, studyset.id)
            .await?)
    }

    #[instrument(skip(self, name))]
    pub async fn create_folder(&self, identity: &Identity, name: &str) -> ServiceResult<Folder> {
        validate_folder_name(&self.limits, name)?;
        let user_id = require_user(identity, "create_folder")?;

        let folder = self.repos.folders().insert_folder(user_id, name).await?;
        info!(folder_id = %folder.id, "Folder created");
        Ok(folder)
    }

    #[instrument(skip(self, name))]
    pub async fn rename_folder(
        &self,
        identity: &Identity,
        id: Uuid,
        name: &str,
    ) -> ServiceResult<Folder> {
        validate_folder_name(&self.limits, name)?;
        self.owned_folder(identity, id, "rename_folder").await?;

        self.repos
            .folders()
            .rename_folder(id, name)
            .await?
            .ok_or_else(|| missing(identity, "rename_folder"))
    }

    #[instrument(skip(self))]
    pub async fn delete_folder(&self, identity: &Identity, id: Uuid) -> ServiceResult<Uuid> {
        self.owned_folder(identity, id, "delete_folder").await?;

        if !self.repos.folders().delete_folder(id).await? {
            return Err(missing(identity, "delete_folder"));
        }
        info!(folder_id = %id, "Folder deleted");
        Ok(id)
    }

    /// File a readable studyset into one of the requester's folders.
    #[instrument(skip(self))]
    pub async fn set_studyset_folder(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
        folder_id: Uuid,
    ) -> ServiceResult<bool> {
        let folder = self
            .owned_folder(identity, folder_id, "set_studyset_folder")
            .await?;
        let studyset = self
            .repos
            .studysets()
            .get_studyset(studyset_id)
            .await?
            .ok_or_else(|| missing(identity, "set_studyset_folder"))?;
        ensure_can_read(
            identity,
            studyset.user_id,
            studyset.private,
            "set_studyset_folder",
        )?;

        self.repos
            .folders()
            .set_studyset_folder(folder.user_id, studyset.id, folder.id)
            .await?;
        Ok(true)
    }

    /// Take a studyset out of whichever folder the requester filed it into.
    #[instrument(skip(self))]
    pub async fn remove_studyset_from_folder(
        &self,
        identity: &Identity,
        studyset_id: Uuid,
    ) -> ServiceResult<bool> {
        let user_id = require_user(identity, "remove_studyset_from_folder")?;
        self.repos
            .folders()
            .remove_studyset_from_folder(user_id, studyset_id)
            .await?;
        Ok(true)
    }

    async fn owned_folder(
        &self,
        identity: &Identity,
        id: Uuid,
        operation: &'static str,
    ) -> ServiceResult<Folder> {
        let folder = self
            .repos
            .folders()
            .get_folder(id)
            .await?
            .ok_or_else(|| missing(identity, operation))?;
        ensure_can_write(identity, folder.user_id, operation)?;
        Ok(folder)
    }
}
