//! Conversions from wire formats to domain types.

use greenmarket_core::{CartLine, CartLineId, CartSnapshot, ProductId, UserId};

use super::types::{CartLineDto, Product, ProductDto, User, UserDto};

/// Build a [`CartSnapshot`] from the line list returned by `GET /api/cart`.
///
/// The backend repeats the owning username on every line; an empty line list
/// carries no owner and yields the empty snapshot.
pub fn convert_cart(lines: Vec<CartLineDto>) -> CartSnapshot {
    let username = lines
        .first()
        .map(|line| line.username.clone())
        .unwrap_or_default();
    let lines = lines.into_iter().map(convert_cart_line).collect();
    CartSnapshot::new(username, lines)
}

fn convert_cart_line(dto: CartLineDto) -> CartLine {
    CartLine {
        line_id: CartLineId::new(dto.id),
        product_id: ProductId::new(dto.product_id),
        quantity: dto.quantity,
        unit_price: dto.price,
        display_name: dto.name,
        image_path: dto.image,
    }
}

pub fn convert_product(dto: ProductDto) -> Product {
    Product {
        id: ProductId::new(dto.id),
        name: dto.name,
        price: dto.price,
        image_path: dto.image,
    }
}

pub fn convert_user(dto: UserDto) -> User {
    User {
        id: UserId::new(dto.id),
        username: dto.username,
        email: dto.email,
    }
}
