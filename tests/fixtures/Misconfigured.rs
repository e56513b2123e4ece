#[before_class]
#[after_phase(producer)]
fn tear_down(ctx: &mut Context) {}
