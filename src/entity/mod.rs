pub mod addresses;
pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod otps;
pub mod payments;
pub mod product_images;
pub mod product_tags;
pub mod products;
pub mod profiles;
pub mod tags;
pub mod users;
pub mod vendors;
pub mod wishlist_items;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use otps::Entity as Otps;
pub use payments::Entity as Payments;
pub use product_images::Entity as ProductImages;
pub use product_tags::Entity as ProductTags;
pub use products::Entity as Products;
pub use profiles::Entity as Profiles;
pub use tags::Entity as Tags;
pub use users::Entity as Users;
pub use vendors::Entity as Vendors;
pub use wishlist_items::Entity as WishlistItems;
