pub mod cart_item;
pub mod flower;
pub mod order;
pub mod order_item;
pub mod shipping_address;
pub mod user;

pub use cart_item::Entity as CartItem;
pub use flower::Entity as Flower;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use shipping_address::Entity as ShippingAddress;
pub use user::Entity as User;

pub type CartItemModel = cart_item::Model;
pub type FlowerModel = flower::Model;
pub type OrderModel = order::Model;
pub type OrderItemModel = order_item::Model;
pub type ShippingAddressModel = shipping_address::Model;
pub type UserModel = user::Model;
