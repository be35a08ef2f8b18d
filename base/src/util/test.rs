pub struct MethodMock<Args, Ret> {
    pub args: Vec<Args>,
    pub rets: Vec<Ret>,
}

impl<Args, Ret> MethodMock<Args, Ret> {
    pub fn new() -> Self {
        MethodMock {
            args: vec![],
            rets: vec![],
        }
    }

    pub fn expect(&mut self, ret: Ret) {
        self.rets.insert(0, ret);
    }

    pub fn call(&mut self, args: Args) -> Ret {
        assert!(!self.rets.is_empty(), "unexpected mock call");
        self.args.push(args);
        self.rets.pop().unwrap()
    }

    pub fn take_args(&mut self) -> Vec<Args> {
        std::mem::take(&mut self.args)
    }
}

impl<Args, Ret> Default for MethodMock<Args, Ret> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, Ret> Drop for MethodMock<Args, Ret> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(self.args.is_empty(), "unchecked mock calls");
            assert!(self.rets.is_empty(), "missing mock calls");
        }
    }
}
