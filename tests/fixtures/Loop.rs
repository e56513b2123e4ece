#[step]
fn ping(ctx: &mut Context) {
    ctx.produce("ping");
    ctx.consume("pong");
}

#[step]
fn pong(ctx: &mut Context) {
    ctx.produce("pong");
    ctx.consume("ping");
}
