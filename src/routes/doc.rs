use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
        auth::{
            LoginResponse, OtpLoginRequest, PasswordLoginRequest, RefreshRequest, RefreshResponse,
            RequestOtpRequest, RequestOtpResponse, SignupRequest, SignupResponse, TokenPair,
            UserList,
        },
        cart::{AddToCartRequest, CartItemView, CartView, UpdateCartItemRequest},
        catalog::{CategoryList, CreateVendorRequest, TagList, UpdateVendorRequest, VendorList},
        orders::{OrderList, OrderWithItems, UpdateItemStatusRequest, UpdateOrderStatusRequest},
        payments::{CreatePaymentRequest, PaymentIntent, VerifyPaymentRequest},
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    models::{Address, Category, Order, OrderItem, Payment, Product, Tag, UserView, Vendor},
    response::{ApiResponse, Meta},
    routes::{
        addresses, auth, cart, catalog, health, orders, params, payments, products, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::list_users,
        auth::signup,
        auth::request_otp,
        auth::login,
        auth::login_password,
        auth::refresh,
        auth::logout,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        catalog::list_categories,
        catalog::get_category,
        catalog::list_tags,
        catalog::list_vendors,
        catalog::get_vendor,
        catalog::create_vendor,
        catalog::update_vendor,
        catalog::delete_vendor,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_item,
        cart::remove_item,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_item_status,
        payments::create_payment,
        payments::verify_payment,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        addresses::set_default_address,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist
    ),
    components(
        schemas(
            UserView,
            Product,
            Category,
            Tag,
            Vendor,
            Order,
            OrderItem,
            Payment,
            Address,
            SignupRequest,
            SignupResponse,
            RequestOtpRequest,
            RequestOtpResponse,
            OtpLoginRequest,
            PasswordLoginRequest,
            RefreshRequest,
            RefreshResponse,
            TokenPair,
            LoginResponse,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            CategoryList,
            TagList,
            VendorList,
            CreateVendorRequest,
            UpdateVendorRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemView,
            CartView,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            UpdateItemStatusRequest,
            CreatePaymentRequest,
            PaymentIntent,
            VerifyPaymentRequest,
            AddressList,
            CreateAddressRequest,
            UpdateAddressRequest,
            AddWishlistRequest,
            WishlistProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentIntent>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, OTP and password login, token refresh"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Catalog", description = "Categories, tags and vendors"),
        (name = "Cart", description = "Cart endpoints for anonymous and signed-in users"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Payments", description = "Payment gateway endpoints"),
        (name = "Addresses", description = "Delivery address endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
