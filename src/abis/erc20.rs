use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
    }
}

// Older tokens (DSToken-style, e.g. MKR) declare symbol() as bytes32.
sol! {
    #[sol(rpc)]
    interface IERC20Bytes32 {
        function symbol() external view returns (bytes32);
    }
}
