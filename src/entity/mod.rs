pub mod audit_logs;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod product_colors;
pub mod product_images;
pub mod product_reviews;
pub mod product_sizes;
pub mod product_tag_assignments;
pub mod product_tags;
pub mod product_variants;
pub mod products;
pub mod promo_codes;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_colors::Entity as ProductColors;
pub use product_images::Entity as ProductImages;
pub use product_reviews::Entity as ProductReviews;
pub use product_sizes::Entity as ProductSizes;
pub use product_tag_assignments::Entity as ProductTagAssignments;
pub use product_tags::Entity as ProductTags;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use promo_codes::Entity as PromoCodes;
pub use users::Entity as Users;
