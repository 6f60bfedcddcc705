//! ABI bindings for the factory, market, token and price-feed contracts.

use alloy::sol;

sol! {
    /// Deploys and enumerates prediction markets.
    #[sol(rpc)]
    interface IMarketFactory {
        function getMarketsCount() external view returns (uint256);
        function getAllMarkets() external view returns (address[] memory);
        function createMarket(
            address priceFeed,
            string assetName,
            string baseAsset,
            uint256 targetPrice,
            uint256 resolutionTime
        ) external returns (address);
    }

    /// One HIGHER/LOWER price prediction market.
    #[sol(rpc)]
    interface IPredictionMarket {
        function market() external view returns (
            string assetName,
            string baseAsset,
            uint256 targetPrice,
            uint256 resolutionTime,
            uint256 totalHigherBets,
            uint256 totalLowerBets,
            bool resolved,
            bool outcome,
            uint256 finalPrice,
            address randomWinner,
            uint256 randomBonusPool,
            bool automationRegistered,
            bool randomWinnerSelected
        );
        function placeBet(uint256 amount, bool isHigher) external;
        function getUserBetCount(address user) external view returns (uint256);
        function userBets(address user, uint256 index) external view returns (uint256);
        function getUserBet(address user, uint256 index) external view returns (
            uint256 amount,
            bool isHigher,
            bool claimed,
            uint256 payout
        );
        function canClaimBonus(address user) external view returns (bool);
        function claimPayout(uint256 betIndex) external;
        function claimBonusReward() external;
        function emergencyResolve() external;
    }

    /// Betting token with a test faucet.
    #[sol(rpc)]
    interface INosToken {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function mint(address to, uint256 amount) external;
        function canClaimFaucet(address user) external view returns (bool);
        function timeUntilNextClaim(address user) external view returns (uint256);
        function claimFaucet() external;
        function FAUCET_AMOUNT() external view returns (uint256);
    }

    /// Price-feed aggregator proxy.
    #[sol(rpc)]
    interface IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}
