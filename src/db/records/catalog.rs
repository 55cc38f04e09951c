use nawth_schema::{Category, CategoryPatch, NewCategory, NewService, Service, ServicePatch};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_array, encode_bool};
use crate::db::query::SortOrder;
use crate::db::value::Row;
use crate::error::StoreError;

impl Record for Category {
    type New = NewCategory;
    type Patch = CategoryPatch;

    const TABLE: TableSpec = TableSpec {
        name: "categories",
        id_prefix: "cat",
        soft_delete: false,
        unique: &["slug"],
    };
    const FILTERABLE: &'static [&'static str] = &["name", "slug", "parent_id", "is_active"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("name", "name"),
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortOrder) = ("name", SortOrder::Asc);

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Category {
            id: r.text("id")?,
            name: r.text("name")?,
            slug: r.text("slug")?,
            image: r.opt_text("image"),
            description: r.opt_text("description"),
            parent_id: r.opt_text("parent_id"),
            is_active: r.bool("is_active"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
        })
    }

    fn encode_new(new: NewCategory) -> Vec<Assignment> {
        vec![
            Assignment::new("name", new.name),
            Assignment::new("slug", new.slug),
            Assignment::new("image", new.image),
            Assignment::new("description", new.description),
            Assignment::new("parent_id", new.parent_id),
            Assignment::new("is_active", encode_bool(new.is_active)),
        ]
    }

    fn encode_patch(patch: &CategoryPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.name {
            set.push(Assignment::new("name", v));
        }
        if let Some(v) = &patch.slug {
            set.push(Assignment::new("slug", v));
        }
        if let Some(v) = &patch.image {
            set.push(Assignment::new("image", v.clone()));
        }
        if let Some(v) = &patch.description {
            set.push(Assignment::new("description", v.clone()));
        }
        if let Some(v) = &patch.parent_id {
            set.push(Assignment::new("parent_id", v.clone()));
        }
        if let Some(v) = patch.is_active {
            set.push(Assignment::new("is_active", encode_bool(v)));
        }
        set
    }
}

impl Record for Service {
    type New = NewService;
    type Patch = ServicePatch;

    const TABLE: TableSpec = TableSpec {
        name: "services",
        id_prefix: "service",
        soft_delete: true,
        unique: &[],
    };
    const FILTERABLE: &'static [&'static str] = &[
        "title",
        "description",
        "tags",
        "price",
        "duration",
        "category_id",
        "provider_id",
        "is_active",
        "is_featured",
        "rating",
    ];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("newest", "created_at"),
        ("price", "price"),
        ("rating", "rating"),
        ("popular", "views"),
        ("views", "views"),
        ("title", "title"),
    ];
    const COUNTERS: &'static [&'static str] = &["views", "review_count"];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Service {
            id: r.text("id")?,
            title: r.text("title")?,
            description: r.text("description")?,
            price: r.real("price")?,
            duration: r.int("duration")?,
            category_id: r.text("category_id")?,
            provider_id: r.text("provider_id")?,
            images: r.array("images"),
            tags: r.array("tags"),
            is_active: r.bool("is_active"),
            is_featured: r.bool("is_featured"),
            rating: r.real("rating")?,
            review_count: r.int("review_count")?,
            views: r.int("views")?,
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            deleted_at: r.opt_timestamp("deleted_at")?,
        })
    }

    fn encode_new(new: NewService) -> Vec<Assignment> {
        vec![
            Assignment::new("title", new.title),
            Assignment::new("description", new.description),
            Assignment::new("price", new.price),
            Assignment::new("duration", new.duration),
            Assignment::new("category_id", new.category_id),
            Assignment::new("provider_id", new.provider_id),
            Assignment::new("images", encode_array(&new.images)),
            Assignment::new("tags", encode_array(&new.tags)),
            Assignment::new("is_active", encode_bool(new.is_active)),
            Assignment::new("is_featured", encode_bool(new.is_featured)),
            Assignment::new("rating", new.rating),
            Assignment::new("review_count", new.review_count),
            Assignment::new("views", 0i64),
            Assignment::new("deleted_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &ServicePatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.title {
            set.push(Assignment::new("title", v));
        }
        if let Some(v) = &patch.description {
            set.push(Assignment::new("description", v));
        }
        if let Some(v) = patch.price {
            set.push(Assignment::new("price", v));
        }
        if let Some(v) = patch.duration {
            set.push(Assignment::new("duration", v));
        }
        if let Some(v) = &patch.category_id {
            set.push(Assignment::new("category_id", v));
        }
        if let Some(v) = &patch.images {
            set.push(Assignment::new("images", encode_array(v)));
        }
        if let Some(v) = &patch.tags {
            set.push(Assignment::new("tags", encode_array(v)));
        }
        if let Some(v) = patch.is_active {
            set.push(Assignment::new("is_active", encode_bool(v)));
        }
        if let Some(v) = patch.is_featured {
            set.push(Assignment::new("is_featured", encode_bool(v)));
        }
        if let Some(v) = patch.rating {
            set.push(Assignment::new("rating", v));
        }
        if let Some(v) = patch.review_count {
            set.push(Assignment::new("review_count", v));
        }
        set
    }
}
