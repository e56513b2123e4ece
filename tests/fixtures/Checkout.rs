// Two-run checkout scenario: the producer run logs in and fills a cart,
// the consumer run pays with the stored token and cart.

#[before_class]
#[before_phase(consumer)]
fn seed_catalog(ctx: &mut Context) {
    ctx.produce("catalog");
}

#[step]
fn login(ctx: &mut Context) {
    ctx.produce("token");
}

#[step]
fn fill_cart(ctx: &mut Context) {
    let catalog = ctx.consume("catalog");
    ctx.produce("cart");
}

#[step]
fn checkout(ctx: &mut Context) {
    let token = ctx.consume("token");
    let cart = ctx.consume("cart");
    ctx.produce("receipt");
}

#[step]
fn newsletter(ctx: &mut Context) {
    ctx.produce("subscription");
}

#[after_class]
#[after_phase(producer)]
fn drop_catalog(ctx: &mut Context) {}
