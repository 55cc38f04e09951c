use nawth_schema::File;

use super::Repository;
use crate::db::codec::Record;
use crate::db::query::{FilterSet, Sort};
use crate::error::StoreError;

impl Repository<File> {
    /// All live files of `user_id`, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<File>, StoreError> {
        let sort = Sort::resolve(File::SORTABLE, None, None, File::DEFAULT_SORT)?;
        self.find_all(FilterSet::new().eq("user_id", user_id), &sort)
            .await
    }
}
